use axum::extract::FromRequestParts;
use http::request::Parts;
use rulestudio_sdk::TARGET_HEADER;
use rulestudio_sdk::target::normalize_absolute;

use crate::api::rest::error::error_response;
use crate::error::ConsoleError;

/// Engine URL from the `X-Target-URL` header, normalised.
///
/// `None` when the header is absent or blank. A present but malformed value
/// is rejected with 400.
pub struct TargetUrl(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for TargetUrl {
    type Rejection = axum::response::Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(TARGET_HEADER) else {
            return Ok(Self(None));
        };
        let raw = header.to_str().map_err(|_| {
            error_response(ConsoleError::Validation(
                "invalid X-Target-URL header".into(),
            ))
        })?;
        if raw.trim().is_empty() {
            return Ok(Self(None));
        }
        let url = normalize_absolute(raw).map_err(|_| {
            error_response(ConsoleError::Validation(format!(
                "X-Target-URL must be an absolute http(s) URL: '{raw}'"
            )))
        })?;
        Ok(Self(Some(url)))
    }
}

/// `?limit=N` on the activity log.
#[derive(Debug, Default, serde::Deserialize)]
pub struct ActivityQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}
