//! RuleStudio SDK - client library for the stream-processing engine REST API
//!
//! # Features
//!
//! - **Switchable target**: one client, engine selected at runtime, either
//!   directly or through the console proxy via `X-Target-URL`
//! - **Typed errors**: timeouts, unreachable engines and engine error
//!   envelopes are distinct [`ClientError`] kinds
//! - **Resource accessors**: one method per engine endpoint
//! - **Helpers**: `CREATE` statement reconstruction, SQL validation with
//!   local fallback, throughput polling, batch requests, trace capture
//!
//! # Examples
//!
//! ## Basic request
//! ```ignore
//! use rulestudio_sdk::{ClientConfig, EngineClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EngineClient::new(ClientConfig::direct("http://127.0.0.1:9081")?)?;
//!
//!     for name in client.streams().list().await? {
//!         println!("{name}: {}", client.streams().definition_sql(&name).await?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Throughput polling
//! ```ignore
//! use std::time::Duration;
//! use rulestudio_sdk::metrics::MetricsPoller;
//!
//! # async fn example(client: rulestudio_sdk::EngineClient) {
//! let handle = MetricsPoller::new(client, vec!["rule1".into()])
//!     .interval(Duration::from_secs(2))
//!     .start();
//! tokio::time::sleep(Duration::from_secs(10)).await;
//! let samples = handle.stop().await;
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod batch;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod fallback;
pub mod metrics;
pub mod resources;
pub mod sql;
pub mod target;
pub mod trace_capture;
pub mod types;
pub mod validation;

pub use catalog::{EnrichedRule, ListStrategy, RuleCatalog};
pub use client::EngineClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use target::{EngineTarget, TARGET_HEADER};
pub use validation::{ValidationReport, ValidationSource, validate_sql};

pub use http::{Method, StatusCode};
