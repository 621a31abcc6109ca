//! Error types for the engine client

use http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Error type for engine client operations
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Request build error
    ///
    /// Returned when a request cannot be constructed (missing path parameter,
    /// body serialization failure, invalid target URL).
    #[error("Request build error: {0}")]
    BuildError(String),

    /// Connection error
    ///
    /// Returned when the network connection to the configured endpoint fails.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request timeout
    ///
    /// Returned when the call does not complete within the client timeout.
    /// Never produced for server-returned errors.
    #[error("Timeout: request to {url} did not complete within {timeout:?}")]
    Timeout {
        /// URL that was being requested
        url: String,
        /// Timeout that expired
        timeout: Duration,
    },

    /// The proxy could not reach the target engine (HTTP 502)
    #[error("Cannot connect to target server: {0}")]
    UpstreamUnreachable(String),

    /// Engine returned a non-2xx status with a parseable `{error, message}` envelope
    #[error("Engine error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: StatusCode,
        /// Engine error code, if the envelope carried one
        code: Option<String>,
        /// Human readable message
        message: String,
    },

    /// Engine returned a non-2xx status with a body that is not an error envelope
    #[error("HTTP error {status}: {body}")]
    Http {
        /// HTTP status code
        status: StatusCode,
        /// Raw response text
        body: String,
    },

    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid response
    ///
    /// Returned when a response cannot be decoded into the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Check if error is a timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if the target engine could not be reached
    #[must_use]
    pub const fn is_unreachable(&self) -> bool {
        matches!(self, Self::UpstreamUnreachable(_) | Self::Connection(_))
    }

    /// Check if error is a connection error
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Get HTTP status code if the engine answered with an error status
    #[must_use]
    pub const fn http_status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } | Self::Http { status, .. } => Some(*status),
            Self::UpstreamUnreachable(_) => Some(StatusCode::BAD_GATEWAY),
            _ => None,
        }
    }

    /// Check if the engine reported the resource as missing
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.http_status() == Some(StatusCode::NOT_FOUND)
    }

    /// Message suitable for display, without the variant prefix
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            Self::Http { body, status } if body.trim().is_empty() => status.to_string(),
            Self::Http { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }

    /// Check if error is retryable
    ///
    /// Returns true for transient errors like connection failures and timeouts,
    /// but false for errors like invalid requests that won't succeed on retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout { .. } | Self::UpstreamUnreachable(_) => true,
            Self::Api { status, .. } | Self::Http { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

/// Error body returned by the engine: `{"error": 1000, "message": "..."}`.
///
/// `error` is a numeric code on most engine versions and a string on some.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorEnvelope {
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorEnvelope {
    /// Parse an error envelope; `None` when the body is not one.
    pub(crate) fn parse(body: &str) -> Option<Self> {
        let envelope: Self = serde_json::from_str(body).ok()?;
        if envelope.error.is_none() && envelope.message.is_none() {
            return None;
        }
        Some(envelope)
    }

    pub(crate) fn code(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub(crate) fn message(&self) -> String {
        self.message
            .clone()
            .filter(|m| !m.is_empty())
            .or_else(|| self.code())
            .unwrap_or_default()
    }

    pub(crate) fn into_error(self, status: StatusCode) -> ClientError {
        ClientError::Api {
            status,
            code: self.code(),
            message: self.message(),
        }
    }
}

/// Result type alias for engine client operations
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_with_numeric_code() {
        let env = ErrorEnvelope::parse(r#"{"error":1000,"message":"stream demo not found"}"#)
            .unwrap();
        assert_eq!(env.code().as_deref(), Some("1000"));
        assert_eq!(env.message(), "stream demo not found");
    }

    #[test]
    fn envelope_with_only_error_string() {
        let env = ErrorEnvelope::parse(r#"{"error":"bad request"}"#).unwrap();
        assert_eq!(env.message(), "bad request");
    }

    #[test]
    fn non_envelope_json_is_rejected() {
        assert!(ErrorEnvelope::parse(r#"{"status":"running"}"#).is_none());
        assert!(ErrorEnvelope::parse("plain text failure").is_none());
        assert!(ErrorEnvelope::parse("[1,2,3]").is_none());
    }

    #[test]
    fn status_predicates() {
        let err = ClientError::Api {
            status: StatusCode::NOT_FOUND,
            code: None,
            message: "missing".into(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_timeout());
        assert!(!err.is_retryable());

        let err = ClientError::UpstreamUnreachable("down".into());
        assert!(err.is_unreachable());
        assert_eq!(err.http_status(), Some(StatusCode::BAD_GATEWAY));
        assert!(err.is_retryable());
    }
}
