//! Console error type

use http::StatusCode;
use rulestudio_sdk::ClientError;

/// Errors surfaced by the console service and its REST API.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("settings storage error: {0}")]
    Storage(String),

    /// No `X-Target-URL` header and no active server.
    #[error("no target engine: send X-Target-URL or activate a server")]
    NoTarget,

    #[error("request body exceeds maximum of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error(transparent)]
    Engine(#[from] ClientError),
}

impl ConsoleError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// HTTP status the REST layer answers with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::NoTarget => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Engine(e) => engine_status(e),
        }
    }

    /// Stable machine-readable code rendered as the `error` field.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Validation(_) => "validation_error",
            Self::Conflict(_) => "conflict",
            Self::Storage(_) => "storage_error",
            Self::NoTarget => "no_target",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::Engine(e) => match e {
                ClientError::Timeout { .. } => "upstream_timeout",
                ClientError::UpstreamUnreachable(_) | ClientError::Connection(_) => {
                    "upstream_unreachable"
                }
                ClientError::BuildError(_) | ClientError::Config(_) => "invalid_target",
                _ => "engine_error",
            },
        }
    }

    /// Human readable text rendered as the `message` field.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Engine(e) => e.message(),
            other => other.to_string(),
        }
    }
}

fn engine_status(err: &ClientError) -> StatusCode {
    match err {
        ClientError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        ClientError::UpstreamUnreachable(_)
        | ClientError::Connection(_)
        | ClientError::Protocol(_)
        | ClientError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
        ClientError::BuildError(_) | ClientError::Config(_) => StatusCode::BAD_REQUEST,
        ClientError::Api { status, .. } | ClientError::Http { status, .. } => *status,
    }
}

impl From<std::io::Error> for ConsoleError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}
