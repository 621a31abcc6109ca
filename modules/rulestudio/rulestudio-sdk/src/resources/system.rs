use crate::client::{EngineClient, from_value};
use crate::error::Result;
use crate::types::EngineInfo;

/// `/` and `/ping`
pub struct SystemApi<'a> {
    client: &'a EngineClient,
}

impl<'a> SystemApi<'a> {
    pub(crate) const fn new(client: &'a EngineClient) -> Self {
        Self { client }
    }

    /// Engine version and host information.
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn info(&self) -> Result<EngineInfo> {
        from_value(self.client.get("/").await?)
    }

    /// Liveness probe.
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn ping(&self) -> Result<()> {
        self.client.get("/ping").await.map(|_| ())
    }
}
