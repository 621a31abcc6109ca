use std::time::Duration;

use axum::Json;
use axum::extract::Extension;
use axum::response::Response;
use rulestudio_sdk::validation::{ValidationReport, heuristic_check, validate_sql as run_validation};
use rulestudio_sdk::{ClientConfig, EngineClient};
use tracing::debug;

use crate::api::rest::dto::ValidateRequest;
use crate::api::rest::error::error_response;
use crate::api::rest::extractors::TargetUrl;
use crate::error::ConsoleError;
use crate::module::AppState;

/// Validate SQL against the selected engine, degrading to local checks.
///
/// Engine selection: `X-Target-URL`, then `server_id`, then the active
/// server. With none of them only the local checks run.
pub async fn validate_sql(
    Extension(state): Extension<AppState>,
    target: TargetUrl,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<ValidationReport>, Response> {
    let url = match (target.0, req.server_id.as_deref()) {
        (Some(url), _) => Some(url),
        (None, Some(id)) => Some(
            state
                .store
                .get_server(id)
                .await
                .map_err(error_response)?
                .url,
        ),
        (None, None) => state.store.active_server().await.map(|s| s.url),
    };

    let Some(url) = url else {
        debug!("No engine selected, validating locally");
        return Ok(Json(heuristic_check(&req.sql)));
    };

    let timeout = Duration::from_secs(state.store.settings().await.request_timeout_secs);
    let client = ClientConfig::direct(&url)
        .and_then(|config| EngineClient::new(config.timeout(timeout)))
        .map_err(|e| error_response(ConsoleError::Engine(e)))?;

    Ok(Json(run_validation(&client, &req.sql).await))
}
