//! Models exchanged with the engine and the boundary normalisation step

pub mod envelope;

mod batch;
mod connection;
mod plugin;
mod rule;
mod schema;
mod service;
mod stream;
mod system;
mod trace;

pub use batch::{BatchRequestItem, BatchResponseItem};
pub use connection::ConnectionSpec;
pub use plugin::{PluginKind, PluginSpec};
pub use rule::{RuleDefinition, RuleState, RuleStatus, RuleSummary, RuleTags, RuleTopology};
pub use schema::{SchemaSpec, SchemaType};
pub use service::{ServiceFunction, ServiceSpec};
pub use stream::{FieldType, SourceKind, StreamDetails, StreamField};
pub use system::EngineInfo;
pub use trace::TraceSpan;

pub(crate) use batch::RawBatchResponseItem;
