use serde_json::Value;

use super::segment;
use crate::client::{EngineClient, from_value};
use crate::error::{ClientError, Result};
use crate::types::envelope::list_items;
use crate::types::{RuleDefinition, RuleStatus, RuleSummary, RuleTags, RuleTopology};

/// `/rules`
pub struct RulesApi<'a> {
    client: &'a EngineClient,
}

impl<'a> RulesApi<'a> {
    pub(crate) const fn new(client: &'a EngineClient) -> Self {
        Self { client }
    }

    fn path(id: &str) -> Result<String> {
        Ok(format!("/rules/{}", segment(id, "rule id")?))
    }

    /// All rules with their current status.
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn list(&self) -> Result<Vec<RuleSummary>> {
        list_items(self.client.get("/rules").await?)?
            .into_iter()
            .map(|item| match item {
                Value::String(id) => Ok(RuleSummary::bare(id)),
                other => from_value(other),
            })
            .collect()
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn get(&self, id: &str) -> Result<RuleDefinition> {
        from_value(self.client.get(&Self::path(id)?).await?)
    }

    /// # Errors
    /// Returns [`ClientError::BuildError`] for an empty id; otherwise
    /// propagates transport errors.
    pub async fn create(&self, rule: &RuleDefinition) -> Result<Value> {
        segment(&rule.id, "rule id")?;
        self.client.post("/rules", Some(&to_json(rule)?)).await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn update(&self, id: &str, rule: &RuleDefinition) -> Result<Value> {
        self.client.put(&Self::path(id)?, &to_json(rule)?).await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn delete(&self, id: &str) -> Result<Value> {
        self.client.delete(&Self::path(id)?, None).await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn start(&self, id: &str) -> Result<Value> {
        self.client.post(&format!("{}/start", Self::path(id)?), None).await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn stop(&self, id: &str) -> Result<Value> {
        self.client.post(&format!("{}/stop", Self::path(id)?), None).await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn restart(&self, id: &str) -> Result<Value> {
        self.client.post(&format!("{}/restart", Self::path(id)?), None).await
    }

    /// Raw status object, including all metric keys.
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn status_raw(&self, id: &str) -> Result<Value> {
        self.client.get(&format!("{}/status", Self::path(id)?)).await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn status(&self, id: &str) -> Result<RuleStatus> {
        Ok(RuleStatus::from_value(self.status_raw(id).await?))
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn topology(&self, id: &str) -> Result<RuleTopology> {
        from_value(self.client.get(&format!("{}/topo", Self::path(id)?)).await?)
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn schema(&self, id: &str) -> Result<Value> {
        self.client.get(&format!("{}/schema", Self::path(id)?)).await
    }

    /// Execution plan as text.
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn explain(&self, id: &str) -> Result<Value> {
        self.client.get(&format!("{}/explain", Self::path(id)?)).await
    }

    /// Ask the engine to validate a rule without creating it.
    ///
    /// Not every engine build has this endpoint; see
    /// [`crate::validation::validate_sql`] for the degrading variant.
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn validate(&self, rule: &Value) -> Result<Value> {
        self.client.post("/rules/validate", Some(rule)).await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn tags(&self, id: &str) -> Result<Vec<String>> {
        let raw = self.client.get(&format!("{}/tags", Self::path(id)?)).await?;
        Ok(list_items(raw)?
            .into_iter()
            .filter_map(|v| v.as_str().map(ToString::to_string))
            .collect())
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn add_tags(&self, id: &str, tags: &[String]) -> Result<Value> {
        self.client
            .patch(&format!("{}/tags", Self::path(id)?), &tags_body(tags)?)
            .await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn remove_tags(&self, id: &str, tags: &[String]) -> Result<Value> {
        self.client
            .delete(&format!("{}/tags", Self::path(id)?), Some(&tags_body(tags)?))
            .await
    }

    /// Ids of rules carrying all of `tags`.
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn match_tags(&self, tags: &[String]) -> Result<Vec<String>> {
        let raw = self
            .client
            .request(
                http::Method::GET,
                "/rules/tags/match",
                Some(&tags_body(tags)?),
            )
            .await?;
        Ok(list_items(raw)?
            .into_iter()
            .filter_map(|v| v.as_str().map(ToString::to_string))
            .collect())
    }
}

fn tags_body(tags: &[String]) -> Result<Value> {
    to_json(&RuleTags {
        tags: tags.to_vec(),
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| ClientError::BuildError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tags_body_shape() {
        assert_eq!(
            tags_body(&["a".into(), "b".into()]).unwrap(),
            json!({"tags": ["a", "b"]})
        );
    }
}
