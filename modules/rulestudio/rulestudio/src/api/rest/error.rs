use axum::Json;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::api::rest::dto::ErrorBody;
use crate::error::ConsoleError;

/// Convert a `ConsoleError` into an axum `Response` with a `{error, message}` body.
pub fn error_response(err: ConsoleError) -> Response {
    let status = err.status();
    if status.is_server_error() {
        warn!(status = status.as_u16(), error = %err, "Request failed");
    }
    let body = ErrorBody {
        error: err.code().to_owned(),
        message: err.message(),
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use http_body_util::BodyExt;

    use super::*;

    #[tokio::test]
    async fn renders_code_and_message() {
        let response = error_response(ConsoleError::NoTarget);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(http::header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "no_target");
        assert!(body["message"].as_str().unwrap().contains("X-Target-URL"));
    }
}
