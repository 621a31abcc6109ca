use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One sub-request of a `POST /batch/req` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRequestItem {
    pub method: String,
    pub path: String,
    /// JSON-encoded body; the engine expects a string here
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl BatchRequestItem {
    #[must_use]
    pub fn new(method: &Method, path: impl Into<String>) -> Self {
        Self {
            method: method.as_str().to_string(),
            path: path.into(),
            body: None,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(&Method::GET, path)
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: &Value) -> Self {
        self.body = Some(body.to_string());
        self
    }
}

/// Result of one sub-request, in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResponseItem {
    pub status: u16,
    pub body: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchResponseItem {
    #[must_use]
    pub fn is_success(&self) -> bool {
        StatusCode::from_u16(self.status).is_ok_and(|s| s.is_success())
    }
}

/// Wire form of a batch response item.
///
/// Engines report `code` + `response`; some builds use `status` + `body`.
/// String bodies carrying JSON are decoded.
#[derive(Debug, Deserialize)]
pub(crate) struct RawBatchResponseItem {
    #[serde(alias = "status", default)]
    code: Option<Value>,
    #[serde(alias = "body", default)]
    response: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl RawBatchResponseItem {
    pub(crate) fn normalize(self) -> BatchResponseItem {
        let status = match self.code {
            Some(Value::Number(n)) => n.as_u64().and_then(|c| u16::try_from(c).ok()),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .unwrap_or(if self.error.is_some() { 500 } else { 200 });

        let body = match self.response {
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Value::Null
                } else {
                    serde_json::from_str(trimmed).unwrap_or(Value::String(s))
                }
            }
            Some(other) => other,
            None => Value::Null,
        };

        BatchResponseItem {
            status,
            body,
            error: self.error.filter(|e| !e.is_empty()),
        }
    }
}
