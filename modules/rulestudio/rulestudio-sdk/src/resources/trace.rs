use serde_json::{Value, json};

use super::segment;
use crate::client::{EngineClient, from_value};
use crate::error::Result;
use crate::types::TraceSpan;
use crate::types::envelope::list_items;

/// Rule tracing endpoints.
pub struct TraceApi<'a> {
    client: &'a EngineClient,
}

impl<'a> TraceApi<'a> {
    pub(crate) const fn new(client: &'a EngineClient) -> Self {
        Self { client }
    }

    /// Enable tracing with the given strategy (`always` or `head`).
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn start(&self, rule_id: &str, strategy: &str) -> Result<Value> {
        let path = format!("/rules/{}/trace/start", segment(rule_id, "rule id")?);
        self.client
            .post(&path, Some(&json!({ "strategy": strategy })))
            .await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn stop(&self, rule_id: &str) -> Result<Value> {
        let path = format!("/rules/{}/trace/stop", segment(rule_id, "rule id")?);
        self.client.post(&path, None).await
    }

    /// Trace ids recorded for a rule.
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn list_for_rule(&self, rule_id: &str) -> Result<Vec<String>> {
        let path = format!("/trace/rule/{}", segment(rule_id, "rule id")?);
        Ok(list_items(self.client.get(&path).await?)?
            .into_iter()
            .filter_map(|v| v.as_str().map(ToString::to_string))
            .collect())
    }

    /// Root spans of one trace.
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn get(&self, trace_id: &str) -> Result<Vec<TraceSpan>> {
        let path = format!("/trace/{}", segment(trace_id, "trace id")?);
        match self.client.get(&path).await? {
            Value::Array(items) => items.into_iter().map(from_value).collect(),
            Value::Object(map) if map.is_empty() => Ok(Vec::new()),
            single @ Value::Object(_) => Ok(vec![from_value(single)?]),
            other => Ok(list_items(other)?
                .into_iter()
                .map(from_value)
                .collect::<Result<_>>()?),
        }
    }
}
