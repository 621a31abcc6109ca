//! Batch request aggregation (`POST /batch/req`).

use serde_json::Value;
use tracing::debug;

use crate::client::EngineClient;
use crate::error::{ClientError, Result};
use crate::types::envelope::list_items;
use crate::types::{BatchRequestItem, BatchResponseItem, RawBatchResponseItem};

impl EngineClient {
    /// Send several requests in one round trip.
    ///
    /// The result has exactly one entry per input, in input order, each
    /// with its own status. A failing sub-request does not fail the call;
    /// a failing batch call, or a response with the wrong number of
    /// entries, fails the whole call.
    ///
    /// # Errors
    /// Propagates transport errors of the batch call itself and returns
    /// [`ClientError::InvalidResponse`] for a malformed or mismatched response.
    pub async fn batch(&self, items: &[BatchRequestItem]) -> Result<Vec<BatchResponseItem>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::to_value(items)
            .map_err(|e| ClientError::BuildError(format!("Failed to encode batch: {e}")))?;
        debug!(items = items.len(), "Sending batch request");

        let raw = list_items(self.post("/batch/req", Some(&body)).await?)?;
        if raw.len() != items.len() {
            return Err(ClientError::InvalidResponse(format!(
                "batch returned {} results for {} requests",
                raw.len(),
                items.len()
            )));
        }

        raw.into_iter()
            .map(|item| {
                serde_json::from_value::<RawBatchResponseItem>(item)
                    .map(RawBatchResponseItem::normalize)
                    .map_err(|e| ClientError::InvalidResponse(format!("batch item: {e}")))
            })
            .collect()
    }
}

/// Body of a successful item, or an error carrying its status and message.
///
/// # Errors
/// Returns [`ClientError::Api`] for a non-2xx item.
pub fn item_result(item: BatchResponseItem) -> Result<Value> {
    if item.is_success() {
        return Ok(item.body);
    }
    let status =
        http::StatusCode::from_u16(item.status).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
    let message = item
        .error
        .or_else(|| match &item.body {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map
                .get("message")
                .and_then(Value::as_str)
                .map(ToString::to_string),
            _ => None,
        })
        .unwrap_or_else(|| status.to_string());
    Err(ClientError::Api {
        status,
        code: None,
        message,
    })
}
