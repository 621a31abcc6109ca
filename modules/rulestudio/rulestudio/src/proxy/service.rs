use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use http::{HeaderMap, Method, StatusCode};
use rulestudio_sdk::ClientError;
use tracing::{debug, warn};

use super::headers;
use crate::error::ConsoleError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub type BodyStream = BoxStream<'static, Result<Bytes, reqwest::Error>>;

/// One call to forward.
#[derive(Debug)]
pub struct ProxyRequest {
    pub method: Method,
    /// Normalised engine base URL.
    pub target: String,
    /// Path below the engine root, starting with `/`.
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxyRequest {
    #[must_use]
    pub fn url(&self) -> String {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        match self.query.as_deref() {
            Some(q) if !q.is_empty() => format!("{}{path}?{q}", self.target),
            _ => format!("{}{path}", self.target),
        }
    }
}

/// Engine answer, body streamed through.
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BodyStream,
}

/// Forwards console requests to the selected engine.
pub struct EngineProxy {
    http_client: reqwest::Client,
    request_timeout: Duration,
}

impl EngineProxy {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(request_timeout: Duration) -> Result<Self, ConsoleError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            // No overall timeout; response headers are raced against
            // `request_timeout` below and the body is streamed.
            .build()
            .map_err(|e| ClientError::BuildError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            request_timeout,
        })
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Forward `req` and return the engine's response unchanged apart from
    /// hop-by-hop headers.
    ///
    /// # Errors
    /// [`ClientError::Timeout`] when no response headers arrive in time,
    /// [`ClientError::Connection`] when the engine cannot be reached.
    pub async fn forward(&self, req: ProxyRequest) -> Result<ProxyResponse, ConsoleError> {
        let url = req.url();
        debug!(method = %req.method, url = %url, "Proxying engine request");

        let send_future = self
            .http_client
            .request(req.method, &url)
            .headers(headers::outbound(&req.headers))
            .body(req.body)
            .send();

        let timeout = self.request_timeout;
        let response = tokio::time::timeout(timeout, send_future)
            .await
            .map_err(|_| ClientError::Timeout {
                url: url.clone(),
                timeout,
            })?
            .map_err(|e| {
                warn!(url = %url, error = %e, "Engine request failed");
                if e.is_timeout() {
                    ClientError::Timeout {
                        url: url.clone(),
                        timeout,
                    }
                } else if e.is_connect() {
                    ClientError::Connection(format!("cannot connect to {url}: {e}"))
                } else {
                    ClientError::Protocol(e.to_string())
                }
            })?;

        let status = response.status();
        let headers = headers::relayed(response.headers());
        Ok(ProxyResponse {
            status,
            headers,
            body: response.bytes_stream().boxed(),
        })
    }
}
