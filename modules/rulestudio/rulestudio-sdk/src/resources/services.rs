use serde_json::Value;

use super::segment;
use crate::client::{EngineClient, from_value};
use crate::error::{ClientError, Result};
use crate::types::envelope::{list_items, normalize_names};
use crate::types::{ServiceFunction, ServiceSpec};

/// `/services`
pub struct ServicesApi<'a> {
    client: &'a EngineClient,
}

impl<'a> ServicesApi<'a> {
    pub(crate) const fn new(client: &'a EngineClient) -> Self {
        Self { client }
    }

    fn path(name: &str) -> Result<String> {
        Ok(format!("/services/{}", segment(name, "service name")?))
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn list(&self) -> Result<Vec<String>> {
        normalize_names(self.client.get("/services").await?)
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn get(&self, name: &str) -> Result<Value> {
        self.client.get(&Self::path(name)?).await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn create(&self, spec: &ServiceSpec) -> Result<Value> {
        segment(&spec.name, "service name")?;
        self.client.post("/services", Some(&body(spec)?)).await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn update(&self, name: &str, spec: &ServiceSpec) -> Result<Value> {
        self.client.put(&Self::path(name)?, &body(spec)?).await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn delete(&self, name: &str) -> Result<Value> {
        self.client.delete(&Self::path(name)?, None).await
    }

    /// Functions exported by all services.
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn functions(&self) -> Result<Vec<ServiceFunction>> {
        list_items(self.client.get("/services/functions").await?)?
            .into_iter()
            .map(from_value)
            .collect()
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn function(&self, name: &str) -> Result<ServiceFunction> {
        let path = format!("/services/functions/{}", segment(name, "function name")?);
        from_value(self.client.get(&path).await?)
    }
}

fn body(spec: &ServiceSpec) -> Result<Value> {
    serde_json::to_value(spec).map_err(|e| ClientError::BuildError(e.to_string()))
}
