//! Engine target resolution
//!
//! A target decides where a request is sent. Engines reachable from the
//! caller are addressed directly; engines that must be reached through the
//! console's same-origin proxy are addressed by sending the request to the
//! proxy with the real engine URL in the [`TARGET_HEADER`] header.

use url::Url;

use crate::error::{ClientError, Result};

/// Header carrying the selected engine URL when routing through the proxy.
pub const TARGET_HEADER: &str = "x-target-url";

/// Where engine requests are routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineTarget {
    /// Requests go straight to `{base_url}{path}`.
    Direct {
        /// Engine base URL, without trailing slash
        base_url: String,
    },
    /// Requests go to `{proxy_base}{path}` with `X-Target-URL: {target}`.
    Proxied {
        /// Base URL of the console proxy mount, without trailing slash
        proxy_base: String,
        /// Engine base URL forwarded in the target header
        target: String,
    },
}

impl EngineTarget {
    /// Direct target.
    ///
    /// # Errors
    /// Returns [`ClientError::Config`] when `base_url` is not an absolute
    /// `http(s)` URL.
    pub fn direct(base_url: &str) -> Result<Self> {
        Ok(Self::Direct {
            base_url: normalize_absolute(base_url)?,
        })
    }

    /// Proxied target.
    ///
    /// # Errors
    /// Returns [`ClientError::Config`] when either URL is not absolute `http(s)`.
    pub fn proxied(proxy_base: &str, target: &str) -> Result<Self> {
        Ok(Self::Proxied {
            proxy_base: normalize_absolute(proxy_base)?,
            target: normalize_absolute(target)?,
        })
    }

    /// Pick the routing for a configured engine URL.
    ///
    /// With a proxy base, an absolute engine URL is reached through the proxy.
    /// Without one the engine is addressed directly.
    ///
    /// # Errors
    /// Returns [`ClientError::Config`] when `configured` is not an absolute
    /// `http(s)` URL.
    pub fn resolve(configured: &str, proxy_base: Option<&str>) -> Result<Self> {
        match proxy_base {
            Some(proxy) if !proxy.trim().is_empty() => Self::proxied(proxy, configured),
            _ => Self::direct(configured),
        }
    }

    /// Full URL for a relative engine path.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        let base = match self {
            Self::Direct { base_url } => base_url,
            Self::Proxied { proxy_base, .. } => proxy_base,
        };
        join(base, path)
    }

    /// Value for [`TARGET_HEADER`], present only for proxied targets.
    #[must_use]
    pub fn header_value(&self) -> Option<&str> {
        match self {
            Self::Direct { .. } => None,
            Self::Proxied { target, .. } => Some(target),
        }
    }

    /// Engine URL this target ultimately addresses.
    #[must_use]
    pub fn engine_url(&self) -> &str {
        match self {
            Self::Direct { base_url } => base_url,
            Self::Proxied { target, .. } => target,
        }
    }
}

impl std::fmt::Display for EngineTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct { base_url } => write!(f, "{base_url}"),
            Self::Proxied { proxy_base, target } => write!(f, "{target} via {proxy_base}"),
        }
    }
}

/// Check that `raw` is an absolute `http(s)` URL and strip trailing slashes.
///
/// # Errors
/// Returns [`ClientError::Config`] for relative URLs or other schemes.
pub fn normalize_absolute(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed)
        .map_err(|e| ClientError::Config(format!("invalid engine URL '{trimmed}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ClientError::Config(format!(
            "engine URL must be absolute http(s): '{trimmed}'"
        )));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

// Avoid double slashes between base and path.
fn join(base: &str, path: &str) -> String {
    if path.is_empty() || path == "/" {
        return format!("{base}/");
    }
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_without_proxy_is_direct() {
        let t = EngineTarget::resolve("http://engine:9081/", None).unwrap();
        assert_eq!(
            t,
            EngineTarget::Direct {
                base_url: "http://engine:9081".into()
            }
        );
        assert_eq!(t.url_for("/streams"), "http://engine:9081/streams");
        assert_eq!(t.header_value(), None);
    }

    #[test]
    fn resolve_with_proxy_routes_through_header() {
        let t = EngineTarget::resolve(
            "http://10.0.0.5:9081",
            Some("http://127.0.0.1:9082/api/engine"),
        )
        .unwrap();
        assert_eq!(
            t.url_for("rules/r1/status"),
            "http://127.0.0.1:9082/api/engine/rules/r1/status"
        );
        assert_eq!(t.header_value(), Some("http://10.0.0.5:9081"));
        assert_eq!(t.engine_url(), "http://10.0.0.5:9081");
    }

    #[test]
    fn blank_proxy_is_ignored() {
        let t = EngineTarget::resolve("https://engine.example", Some("  ")).unwrap();
        assert!(matches!(t, EngineTarget::Direct { .. }));
    }

    #[test]
    fn relative_and_foreign_urls_are_rejected() {
        assert!(EngineTarget::resolve("/api", None).is_err());
        assert!(EngineTarget::resolve("ftp://engine", None).is_err());
        assert!(EngineTarget::resolve("engine:9081", None).is_err());
    }

    #[test]
    fn root_path_keeps_single_slash() {
        let t = EngineTarget::direct("http://engine:9081").unwrap();
        assert_eq!(t.url_for("/"), "http://engine:9081/");
        assert_eq!(t.url_for(""), "http://engine:9081/");
    }
}
