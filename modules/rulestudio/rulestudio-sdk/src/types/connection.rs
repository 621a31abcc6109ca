use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::envelope::null_as_default;

/// Shared connection (`/connections`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSpec {
    pub id: String,
    /// Connector type such as `mqtt`
    #[serde(rename = "typ")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub props: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn uses_typ_on_the_wire() {
        let c: ConnectionSpec = serde_json::from_value(json!({
            "id": "mqtt1",
            "typ": "mqtt",
            "props": {"server": "tcp://broker:1883"}
        }))
        .unwrap();
        assert_eq!(c.kind, "mqtt");
        assert_eq!(serde_json::to_value(&c).unwrap()["typ"], "mqtt");
    }
}
