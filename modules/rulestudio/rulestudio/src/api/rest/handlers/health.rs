use axum::Json;
use axum::response::IntoResponse;

use crate::api::rest::dto::HealthResponse;

/// Liveness of the console itself.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
    })
}
