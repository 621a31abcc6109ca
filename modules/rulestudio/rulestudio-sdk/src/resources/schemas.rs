use serde_json::Value;

use super::segment;
use crate::client::EngineClient;
use crate::error::{ClientError, Result};
use crate::types::envelope::normalize_names;
use crate::types::{SchemaSpec, SchemaType};

/// `/schemas/{type}`
pub struct SchemasApi<'a> {
    client: &'a EngineClient,
}

impl<'a> SchemasApi<'a> {
    pub(crate) const fn new(client: &'a EngineClient) -> Self {
        Self { client }
    }

    fn path(typ: SchemaType, name: &str) -> Result<String> {
        Ok(format!("/schemas/{typ}/{}", segment(name, "schema name")?))
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn list(&self, typ: SchemaType) -> Result<Vec<String>> {
        normalize_names(self.client.get(&format!("/schemas/{typ}")).await?)
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn get(&self, typ: SchemaType, name: &str) -> Result<Value> {
        self.client.get(&Self::path(typ, name)?).await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn create(&self, typ: SchemaType, spec: &SchemaSpec) -> Result<Value> {
        segment(&spec.name, "schema name")?;
        self.client
            .post(&format!("/schemas/{typ}"), Some(&body(spec)?))
            .await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn update(&self, typ: SchemaType, name: &str, spec: &SchemaSpec) -> Result<Value> {
        self.client.put(&Self::path(typ, name)?, &body(spec)?).await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn delete(&self, typ: SchemaType, name: &str) -> Result<Value> {
        self.client.delete(&Self::path(typ, name)?, None).await
    }
}

fn body(spec: &SchemaSpec) -> Result<Value> {
    serde_json::to_value(spec).map_err(|e| ClientError::BuildError(e.to_string()))
}
