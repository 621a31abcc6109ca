use serde::{Deserialize, Serialize};

/// `GET /` response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineInfo {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub arch: String,
    #[serde(default)]
    pub up_time_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_usage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_total: Option<String>,
}
