use http::header::{CONNECTION, CONTENT_LENGTH, HOST};
use http::{HeaderMap, HeaderName};
use rulestudio_sdk::TARGET_HEADER;

const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().to_lowercase().as_bytes()).ok())
        .collect();
    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
}

/// Prepare inbound headers for the engine.
///
/// Drops the target selector and the headers the HTTP client derives from
/// the outbound URL and body.
#[must_use]
pub fn outbound(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = inbound.clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(TARGET_HEADER);
    headers.remove(HOST);
    headers.remove(CONTENT_LENGTH);
    headers
}

/// Prepare engine response headers for the caller.
#[must_use]
pub fn relayed(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = upstream.clone();
    strip_hop_by_hop(&mut headers);
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hop_by_hop_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert("connection", "keep-alive".parse().unwrap());
        headers.insert("transfer-encoding", "chunked".parse().unwrap());
        headers.insert("x-custom", "keep-me".parse().unwrap());

        strip_hop_by_hop(&mut headers);

        assert!(headers.get("connection").is_none());
        assert!(headers.get("transfer-encoding").is_none());
        assert_eq!(headers.get("x-custom").unwrap(), "keep-me");
    }

    #[test]
    fn connection_listed_headers_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert("connection", "close, X-Session-Hint".parse().unwrap());
        headers.insert("x-session-hint", "abc".parse().unwrap());
        headers.insert("x-keep", "1".parse().unwrap());

        strip_hop_by_hop(&mut headers);

        assert!(headers.get("x-session-hint").is_none());
        assert_eq!(headers.get("x-keep").unwrap(), "1");
    }

    #[test]
    fn target_and_host_not_forwarded() {
        let mut inbound = HeaderMap::new();
        inbound.insert("x-target-url", "http://engine:9081".parse().unwrap());
        inbound.insert(HOST, "127.0.0.1:9082".parse().unwrap());
        inbound.insert(CONTENT_LENGTH, "12".parse().unwrap());
        inbound.insert("authorization", "Bearer t".parse().unwrap());
        inbound.insert("content-type", "application/json".parse().unwrap());

        let out = outbound(&inbound);

        assert!(out.get("x-target-url").is_none());
        assert!(out.get(HOST).is_none());
        assert!(out.get(CONTENT_LENGTH).is_none());
        assert_eq!(out.get("authorization").unwrap(), "Bearer t");
        assert_eq!(out.get("content-type").unwrap(), "application/json");
    }
}
