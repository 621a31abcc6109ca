//! Same-origin proxy to the engine selected by `X-Target-URL`

pub mod headers;
pub mod service;

pub use service::{EngineProxy, ProxyRequest, ProxyResponse};
