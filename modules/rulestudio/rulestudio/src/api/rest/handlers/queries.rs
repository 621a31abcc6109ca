use axum::Json;
use axum::extract::{Extension, Path};
use axum::response::{IntoResponse, Response};
use http::StatusCode;

use crate::api::rest::error::error_response;
use crate::module::AppState;
use crate::settings::NewQuery;

pub async fn list_queries(Extension(state): Extension<AppState>) -> impl IntoResponse {
    Json(state.store.list_queries().await)
}

pub async fn create_query(
    Extension(state): Extension<AppState>,
    Json(req): Json<NewQuery>,
) -> Result<impl IntoResponse, Response> {
    let query = state.store.add_query(req).await.map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(query)))
}

pub async fn delete_query(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, Response> {
    state
        .store
        .remove_query(&id)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}
