//! Test utilities for console integration tests.
//!
//! Provides a mock engine bound to a random local port that records every
//! request it receives, plus helpers to build application state over a
//! temporary settings file.
//!
//! # Usage
//! ```ignore
//! let engine = MockEngine::start().await;
//! let dir = tempfile::tempdir()?;
//! let state = build_test_app_state(dir.path()).await;
//! let router = test_router(state);
//! ```

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{OriginalUri, Path as UrlPath, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use bytes::Bytes;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::api::rest::routes::register_routes;
use crate::config::ConsoleConfig;
use crate::module::AppState;
use crate::settings::SettingsStore;

/// Delay of the `/slow` endpoint.
pub const SLOW_DELAY: Duration = Duration::from_secs(3);

/// A captured inbound request for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

struct SharedState {
    recorded: Mutex<VecDeque<RecordedRequest>>,
    max_recorded: usize,
}

impl SharedState {
    fn new(max_recorded: usize) -> Self {
        Self {
            recorded: Mutex::new(VecDeque::new()),
            max_recorded,
        }
    }

    async fn record(&self, method: &Method, uri: &str, headers: &HeaderMap, body: &[u8]) {
        let hdrs = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();
        let entry = RecordedRequest {
            method: method.to_string(),
            uri: uri.to_string(),
            headers: hdrs,
            body: body.to_vec(),
        };
        let mut queue = self.recorded.lock().await;
        if queue.len() >= self.max_recorded {
            queue.pop_front();
        }
        queue.push_back(entry);
    }
}

/// A mock engine HTTP server bound to a random local port.
///
/// Routes: `GET /ping`, `GET /slow` (answers after [`SLOW_DELAY`]),
/// `GET /status/{code}`; anything else is echoed back as JSON.
pub struct MockEngine {
    addr: SocketAddr,
    state: Arc<SharedState>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(h) = self.handle.take() {
            h.abort();
        }
    }
}

impl MockEngine {
    /// Start the mock server on `127.0.0.1:0` (random port).
    pub async fn start() -> Self {
        let state = Arc::new(SharedState::new(200));
        let app = Self::router(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock engine");
        let addr = listener.local_addr().expect("failed to get local addr");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("mock server error");
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Return a snapshot of all recorded requests (oldest first).
    pub async fn recorded_requests(&self) -> Vec<RecordedRequest> {
        self.state.recorded.lock().await.iter().cloned().collect()
    }

    fn router(state: Arc<SharedState>) -> Router {
        Router::new()
            .route("/ping", get(ping))
            .route("/slow", get(slow))
            .route("/status/{code}", get(status))
            .fallback(echo)
            .with_state(state)
    }
}

async fn ping(
    State(state): State<Arc<SharedState>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> impl IntoResponse {
    state.record(&Method::GET, &uri.to_string(), &headers, &[]).await;
    StatusCode::OK
}

async fn slow(
    State(state): State<Arc<SharedState>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> impl IntoResponse {
    state.record(&Method::GET, &uri.to_string(), &headers, &[]).await;
    tokio::time::sleep(SLOW_DELAY).await;
    axum::Json(json!([]))
}

async fn status(
    State(state): State<Arc<SharedState>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    UrlPath(code): UrlPath<u16>,
) -> impl IntoResponse {
    state.record(&Method::GET, &uri.to_string(), &headers, &[]).await;
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = json!({"error": 1000, "message": format!("status {code}")});
    (status, axum::Json(body))
}

async fn echo(
    State(state): State<Arc<SharedState>>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    state.record(&method, &uri.to_string(), &headers, &body).await;
    let body: Value = serde_json::from_slice(&body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()));
    let resp = json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "body": body,
    });
    (
        StatusCode::OK,
        [("x-engine-echo", "1")],
        axum::Json(resp),
    )
}

/// Console config with short timeouts for tests.
#[must_use]
pub fn test_config() -> ConsoleConfig {
    ConsoleConfig {
        proxy_timeout_secs: 1,
        max_body_size_bytes: 1024,
        health_check_interval_secs: 0,
        ..ConsoleConfig::default()
    }
}

/// Application state over `settings.json` in `dir`.
pub async fn build_test_app_state(dir: &Path) -> AppState {
    let store = SettingsStore::open(dir.join("settings.json"))
        .await
        .expect("failed to open settings store");
    AppState::new(test_config(), store).expect("failed to build app state")
}

/// Router with every console route registered.
#[must_use]
pub fn test_router(state: AppState) -> Router {
    register_routes(Router::new(), state)
}
