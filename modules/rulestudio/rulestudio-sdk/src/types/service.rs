use serde::{Deserialize, Serialize};

/// Body for `POST /services` and `PUT /services/{name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub name: String,
    /// URL of the service descriptor zip
    pub file: String,
}

/// Entry of `GET /services/functions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceFunction {
    pub name: String,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub interface_name: Option<String>,
    #[serde(default)]
    pub method_name: Option<String>,
}
