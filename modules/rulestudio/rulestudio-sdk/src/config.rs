//! Configuration for the engine client
//!
//! Two routing modes are supported:
//! - Direct: requests go straight to the engine
//! - Proxied: requests go to the console proxy with the engine URL in `X-Target-URL`

use std::time::Duration;

use crate::error::Result;
use crate::target::EngineTarget;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Engine client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Initial routing target; can be swapped later with `EngineClient::set_target`
    pub target: EngineTarget,

    /// Timeout for each request, covering send and body read
    pub timeout: Duration,

    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// User-Agent sent with every request
    pub user_agent: String,
}

impl ClientConfig {
    /// Config for an engine reached directly
    ///
    /// # Errors
    /// Returns [`crate::ClientError::Config`] for a non-absolute URL.
    pub fn direct(base_url: &str) -> Result<Self> {
        Ok(Self::with_target(EngineTarget::direct(base_url)?))
    }

    /// Config for an engine reached through the console proxy
    ///
    /// # Arguments
    /// * `proxy_base` - URL of the proxy mount, e.g. `http://127.0.0.1:9081/api/engine`
    /// * `target` - engine URL forwarded in the target header
    ///
    /// # Errors
    /// Returns [`crate::ClientError::Config`] for a non-absolute URL.
    pub fn via_proxy(proxy_base: &str, target: &str) -> Result<Self> {
        Ok(Self::with_target(EngineTarget::proxied(proxy_base, target)?))
    }

    /// Config with the given target and default timeouts
    #[must_use]
    pub fn with_target(target: EngineTarget) -> Self {
        Self {
            target,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: concat!("rulestudio-sdk/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Override the request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the connect timeout
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
