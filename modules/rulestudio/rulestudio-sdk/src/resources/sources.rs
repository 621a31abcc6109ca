use serde_json::{Value, json};

use super::segment;
use crate::client::EngineClient;
use crate::error::{ClientError, Result};
use crate::sql::reconstruct_create_statement;
use crate::types::envelope::{list_items, normalize_names};
use crate::types::{SourceKind, StreamDetails};

/// Table flavour accepted by `GET /tables?kind=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Scan,
    Lookup,
}

impl TableKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Lookup => "lookup",
        }
    }
}

/// `/streams` and `/tables`; both collections share one contract.
pub struct SourceDefinitionsApi<'a> {
    client: &'a EngineClient,
    kind: SourceKind,
}

impl<'a> SourceDefinitionsApi<'a> {
    pub(crate) const fn new(client: &'a EngineClient, kind: SourceKind) -> Self {
        Self { client, kind }
    }

    #[must_use]
    pub const fn kind(&self) -> SourceKind {
        self.kind
    }

    fn item_path(&self, name: &str) -> Result<String> {
        let what = match self.kind {
            SourceKind::Stream => "stream name",
            SourceKind::Table => "table name",
        };
        Ok(format!("/{}/{}", self.kind.collection(), segment(name, what)?))
    }

    /// Names of all definitions.
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn list(&self) -> Result<Vec<String>> {
        normalize_names(self.client.get(&format!("/{}", self.kind.collection())).await?)
    }

    /// Names of tables of one flavour.
    ///
    /// # Errors
    /// Returns [`ClientError::BuildError`] when called on streams.
    pub async fn list_of_kind(&self, kind: TableKind) -> Result<Vec<String>> {
        if self.kind != SourceKind::Table {
            return Err(ClientError::BuildError(
                "kind filter only applies to tables".into(),
            ));
        }
        normalize_names(self.client.get(&format!("/tables?kind={}", kind.as_str())).await?)
    }

    /// All definitions with their fields and options in one call.
    ///
    /// # Errors
    /// Propagates transport errors; malformed items fail the call.
    pub async fn list_details(&self) -> Result<Vec<StreamDetails>> {
        let path = match self.kind {
            SourceKind::Stream => "/streamdetails",
            SourceKind::Table => "/tabledetails",
        };
        list_items(self.client.get(path).await?)?
            .iter()
            .map(StreamDetails::from_value)
            .collect()
    }

    /// Structured definition.
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn get(&self, name: &str) -> Result<StreamDetails> {
        let raw = self.client.get(&self.item_path(name)?).await?;
        StreamDetails::from_value(&raw)
    }

    /// `CREATE` statement for a definition.
    ///
    /// Uses the statement echoed by the engine when present, otherwise
    /// regenerates one from the structured definition.
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn definition_sql(&self, name: &str) -> Result<String> {
        let details = self.get(name).await?;
        Ok(match details.statement.clone() {
            Some(sql) => sql,
            None => reconstruct_create_statement(self.kind, &details),
        })
    }

    /// Create from a `CREATE STREAM|TABLE` statement.
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn create(&self, sql: &str) -> Result<Value> {
        self.client
            .post(&format!("/{}", self.kind.collection()), Some(&json!({ "sql": sql })))
            .await
    }

    /// Replace with a new statement.
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn update(&self, name: &str, sql: &str) -> Result<Value> {
        self.client
            .put(&self.item_path(name)?, &json!({ "sql": sql }))
            .await
    }

    /// # Errors
    /// Propagates transport errors.
    pub async fn delete(&self, name: &str) -> Result<Value> {
        self.client.delete(&self.item_path(name)?, None).await
    }

    /// Inferred schema.
    ///
    /// # Errors
    /// Propagates transport errors.
    pub async fn schema(&self, name: &str) -> Result<Value> {
        self.client
            .get(&format!("{}/schema", self.item_path(name)?))
            .await
    }
}
