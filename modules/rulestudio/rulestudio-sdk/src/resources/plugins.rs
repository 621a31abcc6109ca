use serde_json::{Value, json};

use super::segment;
use crate::client::EngineClient;
use crate::error::{ClientError, Result};
use crate::types::envelope::normalize_names;
use crate::types::{PluginKind, PluginSpec};

/// `/plugins/{kind}`
pub struct PluginsApi<'a> {
    client: &'a EngineClient,
}

impl<'a> PluginsApi<'a> {
    pub(crate) const fn new(client: &'a EngineClient) -> Self {
        Self { client }
    }

    fn path(kind: PluginKind, name: &str) -> Result<String> {
        Ok(format!("/plugins/{kind}/{}", segment(name, "plugin name")?))
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn list(&self, kind: PluginKind) -> Result<Vec<String>> {
        normalize_names(self.client.get(&format!("/plugins/{kind}")).await?)
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn get(&self, kind: PluginKind, name: &str) -> Result<Value> {
        self.client.get(&Self::path(kind, name)?).await
    }

    /// Install a plugin from a zip URL.
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn create(&self, kind: PluginKind, spec: &PluginSpec) -> Result<Value> {
        segment(&spec.name, "plugin name")?;
        let body =
            serde_json::to_value(spec).map_err(|e| ClientError::BuildError(e.to_string()))?;
        self.client.post(&format!("/plugins/{kind}"), Some(&body)).await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn update(&self, kind: PluginKind, name: &str, spec: &PluginSpec) -> Result<Value> {
        let body =
            serde_json::to_value(spec).map_err(|e| ClientError::BuildError(e.to_string()))?;
        self.client.put(&Self::path(kind, name)?, &body).await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn delete(&self, kind: PluginKind, name: &str) -> Result<Value> {
        self.client.delete(&Self::path(kind, name)?, None).await
    }

    /// Names of user-defined functions across all function plugins.
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn udfs(&self) -> Result<Vec<String>> {
        normalize_names(self.client.get("/plugins/udfs").await?)
    }

    /// Register the functions exported by a function plugin.
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn register_functions(&self, name: &str, functions: &[String]) -> Result<Value> {
        let path = format!(
            "/plugins/functions/{}/register",
            segment(name, "plugin name")?
        );
        self.client
            .post(&path, Some(&json!({ "functions": functions })))
            .await
    }
}
