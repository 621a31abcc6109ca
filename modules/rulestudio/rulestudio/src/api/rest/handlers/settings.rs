use axum::Json;
use axum::extract::Extension;
use axum::response::{IntoResponse, Response};

use crate::api::rest::error::error_response;
use crate::module::AppState;
use crate::settings::SettingsUpdate;

pub async fn get_settings(Extension(state): Extension<AppState>) -> impl IntoResponse {
    Json(state.store.settings().await)
}

pub async fn update_settings(
    Extension(state): Extension<AppState>,
    Json(req): Json<SettingsUpdate>,
) -> Result<impl IntoResponse, Response> {
    let settings = state
        .store
        .update_settings(req)
        .await
        .map_err(error_response)?;
    Ok(Json(settings))
}
