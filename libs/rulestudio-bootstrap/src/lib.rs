//! Process bootstrap shared by RuleStudio binaries: layered configuration,
//! home directory resolution and logging.

pub mod config;
pub mod logging;
pub mod paths;

pub use config::{AppConfig, LoggingConfig, Section, ServerConfig};
pub use logging::init_logging;
