//! RuleStudio console service
//!
//! Serves the REST API used by the browser UI: a same-origin proxy to the
//! selected engine, registered engine connections with health checks, saved
//! queries, the activity log and preferences.

// === PUBLIC API (from SDK) ===
pub use rulestudio_sdk::{ClientError, EngineClient, ValidationReport};

// === MODULE DEFINITION ===
pub mod module;
pub use module::{AppState, ConsoleModule};

pub use config::ConsoleConfig;
pub use error::ConsoleError;

// === INTERNAL MODULES ===
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod config;
pub mod error;
pub mod health;
pub mod proxy;
pub mod settings;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;
