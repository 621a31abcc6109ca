use serde_json::Value;

use crate::client::EngineClient;
use crate::error::Result;

/// `/data`: whole-configuration export and import.
pub struct DataApi<'a> {
    client: &'a EngineClient,
}

impl<'a> DataApi<'a> {
    pub(crate) const fn new(client: &'a EngineClient) -> Self {
        Self { client }
    }

    /// Export streams, tables, rules and plugins as one document.
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn export(&self) -> Result<Value> {
        self.client.get("/data/export").await
    }

    /// Import a document previously produced by [`Self::export`].
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn import(&self, content: &Value) -> Result<Value> {
        self.client.post("/data/import", Some(content)).await
    }

    /// Progress of the last import.
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn import_status(&self) -> Result<Value> {
        self.client.get("/data/import/status").await
    }
}
