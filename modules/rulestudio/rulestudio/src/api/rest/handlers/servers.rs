use axum::Json;
use axum::extract::{Extension, Path};
use axum::response::{IntoResponse, Response};
use http::StatusCode;

use crate::api::rest::error::error_response;
use crate::module::AppState;
use crate::settings::{NewServer, ServerUpdate};

pub async fn list_servers(Extension(state): Extension<AppState>) -> impl IntoResponse {
    Json(state.store.list_servers().await)
}

pub async fn create_server(
    Extension(state): Extension<AppState>,
    Json(req): Json<NewServer>,
) -> Result<impl IntoResponse, Response> {
    let server = state.store.add_server(req).await.map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(server)))
}

pub async fn update_server(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ServerUpdate>,
) -> Result<impl IntoResponse, Response> {
    let server = state
        .store
        .update_server(&id, req)
        .await
        .map_err(error_response)?;
    Ok(Json(server))
}

pub async fn delete_server(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, Response> {
    state
        .store
        .remove_server(&id)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Ping the server now and return the updated record.
pub async fn check_server(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, Response> {
    let server = state.health.check(&id).await.map_err(error_response)?;
    Ok(Json(server))
}

pub async fn activate_server(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, Response> {
    let settings = state
        .store
        .set_active_server(&id)
        .await
        .map_err(error_response)?;
    Ok(Json(settings))
}
