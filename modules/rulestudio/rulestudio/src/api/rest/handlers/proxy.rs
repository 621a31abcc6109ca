use axum::body::Body;
use axum::extract::{Extension, Request};
use axum::response::Response;
use http::Method;
use tracing::warn;

use crate::api::rest::error::error_response;
use crate::api::rest::extractors::TargetUrl;
use crate::error::ConsoleError;
use crate::module::AppState;
use crate::proxy::ProxyRequest;

pub const PROXY_PREFIX: &str = "/api/engine";

/// Engine calls that use POST without changing anything.
const READ_ONLY_POSTS: &[&str] = &["/batch/req", "/rules/validate"];

/// Proxy handler for `/api/engine/{*path}`.
///
/// Resolves the target engine, forwards the request and relays the answer.
pub async fn proxy_handler(
    Extension(state): Extension<AppState>,
    target: TargetUrl,
    req: Request,
) -> Result<Response, Response> {
    let (parts, body) = req.into_parts();

    let path = parts
        .uri
        .path()
        .strip_prefix(PROXY_PREFIX)
        .ok_or_else(|| error_response(ConsoleError::Validation("invalid proxy path".into())))?
        .to_owned();

    let target = match target.0 {
        Some(url) => url,
        None => state
            .store
            .active_server()
            .await
            .map(|s| s.url)
            .ok_or_else(|| error_response(ConsoleError::NoTarget))?,
    };

    let limit = state.config.max_body_size_bytes;
    if let Some(cl) = parts.headers.get(http::header::CONTENT_LENGTH) {
        let declared = cl
            .to_str()
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .ok_or_else(|| {
                error_response(ConsoleError::Validation("invalid Content-Length header".into()))
            })?;
        if declared > limit {
            return Err(error_response(ConsoleError::PayloadTooLarge { limit }));
        }
    }

    let body = axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| error_response(ConsoleError::PayloadTooLarge { limit }))?;

    let method = parts.method.clone();
    let proxy_response = state
        .proxy
        .forward(ProxyRequest {
            method: parts.method,
            target: target.clone(),
            path: path.clone(),
            query: parts.uri.query().map(str::to_owned),
            headers: parts.headers,
            body,
        })
        .await
        .map_err(error_response)?;

    if proxy_response.status.is_success() && is_mutation(&method, &path) {
        let action = format!("engine.{}", method.as_str().to_lowercase());
        if let Err(e) = state
            .store
            .append_activity(&action, &path, Some(&target))
            .await
        {
            warn!(error = %e, "Failed to record engine activity");
        }
    }

    let mut builder = Response::builder().status(proxy_response.status);
    for (name, value) in &proxy_response.headers {
        builder = builder.header(name, value);
    }
    builder
        .body(Body::from_stream(proxy_response.body))
        .map_err(|e| {
            error_response(ConsoleError::Engine(rulestudio_sdk::ClientError::Protocol(
                format!("failed to build response: {e}"),
            )))
        })
}

fn is_mutation(method: &Method, path: &str) -> bool {
    match *method {
        Method::GET | Method::HEAD | Method::OPTIONS => false,
        Method::POST => !READ_ONLY_POSTS.contains(&path),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_not_activity() {
        assert!(!is_mutation(&Method::GET, "/rules"));
        assert!(!is_mutation(&Method::POST, "/batch/req"));
        assert!(is_mutation(&Method::POST, "/rules/r1/start"));
        assert!(is_mutation(&Method::DELETE, "/streams/demo"));
    }
}
