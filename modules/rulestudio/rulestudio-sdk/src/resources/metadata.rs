use std::fmt;

use serde_json::Value;

use super::segment;
use crate::client::EngineClient;
use crate::error::Result;
use crate::types::envelope::normalize_names;

/// Collections under `/metadata` that carry conf keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKind {
    Sources,
    Sinks,
    Connections,
}

impl MetadataKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sources => "sources",
            Self::Sinks => "sinks",
            Self::Connections => "connections",
        }
    }
}

impl fmt::Display for MetadataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `/metadata`: connector descriptions and conf key templates.
pub struct MetadataApi<'a> {
    client: &'a EngineClient,
}

impl<'a> MetadataApi<'a> {
    pub(crate) const fn new(client: &'a EngineClient) -> Self {
        Self { client }
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn sources(&self) -> Result<Value> {
        self.client.get("/metadata/sources").await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn sinks(&self) -> Result<Value> {
        self.client.get("/metadata/sinks").await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn functions(&self) -> Result<Value> {
        self.client.get("/metadata/functions").await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn source(&self, name: &str) -> Result<Value> {
        let path = format!("/metadata/sources/{}", segment(name, "source type")?);
        self.client.get(&path).await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn sink(&self, name: &str) -> Result<Value> {
        let path = format!("/metadata/sinks/{}", segment(name, "sink type")?);
        self.client.get(&path).await
    }

    fn conf_keys_path(kind: MetadataKind, typ: &str) -> Result<String> {
        Ok(format!(
            "/metadata/{kind}/{}/confKeys",
            segment(typ, "connector type")?
        ))
    }

    /// Names of conf keys defined for a connector type.
    ///
    /// The engine answers either with a list of names or with an object
    /// keyed by conf key name.
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn conf_keys(&self, kind: MetadataKind, typ: &str) -> Result<Vec<String>> {
        match self.client.get(&Self::conf_keys_path(kind, typ)?).await? {
            Value::Object(map) if !map.contains_key("value") && !map.contains_key("data") => {
                Ok(map.keys().cloned().collect())
            }
            other => normalize_names(other),
        }
    }

    /// Create or replace a conf key.
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn put_conf_key(
        &self,
        kind: MetadataKind,
        typ: &str,
        key: &str,
        props: &Value,
    ) -> Result<Value> {
        let path = format!(
            "{}/{}",
            Self::conf_keys_path(kind, typ)?,
            segment(key, "conf key")?
        );
        self.client.put(&path, props).await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn delete_conf_key(&self, kind: MetadataKind, typ: &str, key: &str) -> Result<Value> {
        let path = format!(
            "{}/{}",
            Self::conf_keys_path(kind, typ)?,
            segment(key, "conf key")?
        );
        self.client.delete(&path, None).await
    }
}
