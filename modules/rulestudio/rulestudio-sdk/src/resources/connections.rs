use serde_json::Value;

use super::segment;
use crate::client::{EngineClient, from_value};
use crate::error::{ClientError, Result};
use crate::types::ConnectionSpec;
use crate::types::envelope::list_items;

/// `/connections`
pub struct ConnectionsApi<'a> {
    client: &'a EngineClient,
}

impl<'a> ConnectionsApi<'a> {
    pub(crate) const fn new(client: &'a EngineClient) -> Self {
        Self { client }
    }

    fn path(id: &str) -> Result<String> {
        Ok(format!("/connections/{}", segment(id, "connection id")?))
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn list(&self) -> Result<Vec<Value>> {
        list_items(self.client.get("/connections").await?)
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn get(&self, id: &str) -> Result<ConnectionSpec> {
        from_value(self.client.get(&Self::path(id)?).await?)
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn create(&self, spec: &ConnectionSpec) -> Result<Value> {
        segment(&spec.id, "connection id")?;
        self.client.post("/connections", Some(&body(spec)?)).await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn update(&self, id: &str, spec: &ConnectionSpec) -> Result<Value> {
        self.client.put(&Self::path(id)?, &body(spec)?).await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn delete(&self, id: &str) -> Result<Value> {
        self.client.delete(&Self::path(id)?, None).await
    }
}

fn body(spec: &ConnectionSpec) -> Result<Value> {
    serde_json::to_value(spec).map_err(|e| ClientError::BuildError(e.to_string()))
}
