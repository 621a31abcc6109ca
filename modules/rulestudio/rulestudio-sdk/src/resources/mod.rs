//! Resource accessors
//!
//! Each accessor borrows the [`EngineClient`](crate::EngineClient) and maps
//! one method to one engine endpoint. Required path parameters must be
//! non-empty; nothing else is validated here and transport errors are
//! returned unchanged.

mod connections;
mod data;
mod metadata;
mod plugins;
mod rules;
mod schemas;
mod services;
mod sources;
mod system;
mod trace;

pub use connections::ConnectionsApi;
pub use data::DataApi;
pub use metadata::{MetadataApi, MetadataKind};
pub use plugins::PluginsApi;
pub use rules::RulesApi;
pub use schemas::SchemasApi;
pub use services::ServicesApi;
pub use sources::{SourceDefinitionsApi, TableKind};
pub use system::SystemApi;
pub use trace::TraceApi;

pub use crate::types::SourceKind;

use crate::error::{ClientError, Result};

/// Percent-encode a required path segment.
pub(crate) fn segment(value: &str, what: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(ClientError::BuildError(format!("{what} must not be empty")));
    }
    Ok(urlencoding::encode(value).into_owned())
}
