use axum::Json;
use axum::extract::{Extension, Query};
use axum::response::IntoResponse;

use crate::api::rest::extractors::ActivityQuery;
use crate::module::AppState;

/// Activity log, newest first.
pub async fn list_activity(
    Extension(state): Extension<AppState>,
    Query(query): Query<ActivityQuery>,
) -> impl IntoResponse {
    Json(state.store.recent_activity(query.limit).await)
}
