use axum::Router;
use axum::routing::{any, get, post, put};

use crate::api::rest::handlers::{activity, health, proxy, queries, servers, settings, sql};
use crate::module::AppState;

/// Register all console REST routes.
pub fn register_routes(router: Router, state: AppState) -> Router {
    router
        // Server connections
        .route(
            "/api/servers",
            get(servers::list_servers).post(servers::create_server),
        )
        .route(
            "/api/servers/{id}",
            put(servers::update_server).delete(servers::delete_server),
        )
        .route("/api/servers/{id}/check", post(servers::check_server))
        .route("/api/servers/{id}/activate", post(servers::activate_server))
        // Saved queries
        .route(
            "/api/queries",
            get(queries::list_queries).post(queries::create_query),
        )
        .route(
            "/api/queries/{id}",
            axum::routing::delete(queries::delete_query),
        )
        // Activity and preferences
        .route("/api/activity", get(activity::list_activity))
        .route(
            "/api/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        // SQL helpers
        .route("/api/sql/validate", post(sql::validate_sql))
        // Engine proxy; the engine root needs its own routes
        .route("/api/engine", any(proxy::proxy_handler))
        .route("/api/engine/", any(proxy::proxy_handler))
        .route("/api/engine/{*path}", any(proxy::proxy_handler))
        .route("/health", get(health::health))
        .layer(axum::Extension(state))
}
