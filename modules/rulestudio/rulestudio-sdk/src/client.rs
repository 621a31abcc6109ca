//! EngineClient - JSON transport to the stream-processing engine

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ErrorEnvelope, Result};
use crate::resources::{
    ConnectionsApi, DataApi, MetadataApi, PluginsApi, RulesApi, SchemasApi, ServicesApi,
    SourceDefinitionsApi, SourceKind, SystemApi, TraceApi,
};
use crate::target::{EngineTarget, TARGET_HEADER};

/// Engine REST client
///
/// Cheap to clone; clones share the HTTP connection pool and the active
/// target, so a target switch is visible to every clone.
#[derive(Clone)]
pub struct EngineClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    target: ArcSwap<EngineTarget>,
    timeout: Duration,
}

impl std::fmt::Debug for EngineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineClient")
            .field("target", &*self.inner.target.load())
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

impl EngineClient {
    /// Create a client from configuration
    ///
    /// # Errors
    /// Returns [`ClientError::BuildError`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        debug!(
            target_url = %config.target,
            timeout = ?config.timeout,
            "Creating EngineClient"
        );

        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| ClientError::BuildError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                target: ArcSwap::from_pointee(config.target),
                timeout: config.timeout,
            }),
        })
    }

    /// Replace the active target; the next request uses it.
    pub fn set_target(&self, target: EngineTarget) {
        debug!(target_url = %target, "Switching engine target");
        self.inner.target.store(Arc::new(target));
    }

    /// Currently active target
    #[must_use]
    pub fn target(&self) -> Arc<EngineTarget> {
        self.inner.target.load_full()
    }

    /// Default per-request timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Issue a request and decode the body as JSON.
    ///
    /// Empty success bodies decode to `{}`; non-JSON success bodies are
    /// returned as a JSON string.
    ///
    /// # Errors
    /// See [`ClientError`] for the kinds produced.
    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        self.request_with_timeout(method, path, body, self.inner.timeout)
            .await
    }

    /// Same as [`Self::request`] with an explicit timeout.
    ///
    /// # Errors
    /// See [`ClientError`] for the kinds produced.
    pub async fn request_with_timeout(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        timeout: Duration,
    ) -> Result<Value> {
        let target = self.inner.target.load_full();
        let url = target.url_for(path);

        debug!(method = %method, url = %url, "Engine request");

        let mut req = self.inner.http.request(method.clone(), &url);
        if let Some(header) = target.header_value() {
            req = req.header(TARGET_HEADER, header);
        }
        if let Some(body) = body {
            let bytes = serde_json::to_vec(body)
                .map_err(|e| ClientError::BuildError(format!("Failed to encode body: {e}")))?;
            trace!("Request body: {} bytes", bytes.len());
            req = req
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(bytes);
        }

        let started = Instant::now();
        let exchange = async {
            let resp = req.send().await.map_err(map_reqwest_error)?;
            let status = resp.status();
            let text = resp.text().await.map_err(map_reqwest_error)?;
            Ok::<_, ClientError>((status, text))
        };

        let (status, text) = match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(method = %method, url = %url, timeout = ?timeout, "Engine request timed out");
                return Err(ClientError::Timeout { url, timeout });
            }
        };

        debug!(
            method = %method,
            url = %url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Engine response"
        );

        decode_response(status, &text)
    }

    /// GET `path`
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn get(&self, path: &str) -> Result<Value> {
        self.request(Method::GET, path, None).await
    }

    /// POST `path` with an optional JSON body
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn post(&self, path: &str, body: Option<&Value>) -> Result<Value> {
        self.request(Method::POST, path, body).await
    }

    /// PUT `path` with a JSON body
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn put(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::PUT, path, Some(body)).await
    }

    /// PATCH `path` with a JSON body
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::PATCH, path, Some(body)).await
    }

    /// DELETE `path`, optionally with a JSON body
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn delete(&self, path: &str, body: Option<&Value>) -> Result<Value> {
        self.request(Method::DELETE, path, body).await
    }

    /// System endpoints (`/`, `/ping`)
    #[must_use]
    pub fn system(&self) -> SystemApi<'_> {
        SystemApi::new(self)
    }

    /// Stream definitions
    #[must_use]
    pub fn streams(&self) -> SourceDefinitionsApi<'_> {
        SourceDefinitionsApi::new(self, SourceKind::Stream)
    }

    /// Table definitions
    #[must_use]
    pub fn tables(&self) -> SourceDefinitionsApi<'_> {
        SourceDefinitionsApi::new(self, SourceKind::Table)
    }

    /// Rules
    #[must_use]
    pub fn rules(&self) -> RulesApi<'_> {
        RulesApi::new(self)
    }

    /// Rule tracing
    #[must_use]
    pub fn trace(&self) -> TraceApi<'_> {
        TraceApi::new(self)
    }

    /// Plugins
    #[must_use]
    pub fn plugins(&self) -> PluginsApi<'_> {
        PluginsApi::new(self)
    }

    /// External services
    #[must_use]
    pub fn services(&self) -> ServicesApi<'_> {
        ServicesApi::new(self)
    }

    /// Source/sink metadata and conf keys
    #[must_use]
    pub fn metadata(&self) -> MetadataApi<'_> {
        MetadataApi::new(self)
    }

    /// Schema registry
    #[must_use]
    pub fn schemas(&self) -> SchemasApi<'_> {
        SchemasApi::new(self)
    }

    /// Shared connections
    #[must_use]
    pub fn connections(&self) -> ConnectionsApi<'_> {
        ConnectionsApi::new(self)
    }

    /// Data import/export
    #[must_use]
    pub fn data(&self) -> DataApi<'_> {
        DataApi::new(self)
    }
}

/// Map reqwest errors to ClientError
fn map_reqwest_error(error: reqwest::Error) -> ClientError {
    if error.is_connect() {
        ClientError::Connection(error.to_string())
    } else if error.is_timeout() {
        ClientError::Timeout {
            url: error.url().map(ToString::to_string).unwrap_or_default(),
            timeout: Duration::ZERO,
        }
    } else if error.is_decode() || error.is_body() {
        ClientError::InvalidResponse(error.to_string())
    } else if error.is_builder() {
        ClientError::BuildError(error.to_string())
    } else {
        ClientError::Protocol(error.to_string())
    }
}

/// Turn a status and body text into a JSON value or a typed error.
pub(crate) fn decode_response(status: StatusCode, text: &str) -> Result<Value> {
    if status == StatusCode::BAD_GATEWAY {
        let detail = ErrorEnvelope::parse(text)
            .map(|e| e.message())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "the proxy could not reach the engine".to_string());
        return Err(ClientError::UpstreamUnreachable(detail));
    }

    if !status.is_success() {
        return Err(match ErrorEnvelope::parse(text) {
            Some(envelope) => envelope.into_error(status),
            None => ClientError::Http {
                status,
                body: text.to_string(),
            },
        });
    }

    if text.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }

    Ok(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}

/// Deserialize a decoded value into a typed model.
pub(crate) fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| ClientError::InvalidResponse(e.to_string()))
}
