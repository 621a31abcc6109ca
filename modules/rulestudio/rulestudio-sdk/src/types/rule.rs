//! Rule models.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::envelope::null_as_default;

/// Rule execution state as reported by the engine.
///
/// The engine reports a string such as `"running"` or
/// `"stopped: canceled manually."`, and some versions a numeric code.
/// Unrecognised strings are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleState {
    Running,
    Stopped { reason: Option<String> },
    Starting,
    Stopping,
    Unknown(String),
}

impl RuleState {
    /// Parse a state string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower == "running" {
            Self::Running
        } else if lower.starts_with("stopped") {
            let reason = trimmed
                .split_once(':')
                .map(|(_, r)| r.trim().to_string())
                .filter(|r| !r.is_empty());
            Self::Stopped { reason }
        } else if lower.starts_with("starting") {
            Self::Starting
        } else if lower.starts_with("stopping") {
            Self::Stopping
        } else {
            Self::Unknown(trimmed.to_string())
        }
    }

    /// Map a numeric state code.
    #[must_use]
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Stopped { reason: None },
            1 => Self::Starting,
            2 => Self::Running,
            3 => Self::Stopping,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Parse either representation.
    #[must_use]
    pub fn from_value(raw: &Value) -> Self {
        match raw {
            Value::String(s) => Self::parse(s),
            Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Unknown(n.to_string()), Self::from_code),
            Value::Null => Self::Unknown(String::new()),
            other => Self::Unknown(other.to_string()),
        }
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for RuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("running"),
            Self::Stopped { reason: None } => f.write_str("stopped"),
            Self::Stopped { reason: Some(r) } => write!(f, "stopped: {r}"),
            Self::Starting => f.write_str("starting"),
            Self::Stopping => f.write_str("stopping"),
            Self::Unknown(raw) => f.write_str(raw),
        }
    }
}

impl Serialize for RuleState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RuleState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_value(&Value::deserialize(deserializer)?))
    }
}

/// Entry of `GET /rules`.
///
/// `status` is the parsed state; `status_text` is what the engine sent and
/// is what gets serialised back out as `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRuleSummary")]
pub struct RuleSummary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub status: RuleState,
    #[serde(rename = "status")]
    pub status_text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<bool>,
}

impl RuleSummary {
    /// Summary for a list entry that carried only the id.
    #[must_use]
    pub fn bare(id: String) -> Self {
        Self {
            id,
            name: None,
            status: unknown_state(),
            status_text: String::new(),
            tags: Vec::new(),
            trace: None,
        }
    }
}

#[derive(Deserialize)]
struct RawRuleSummary {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    status: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    tags: Vec<String>,
    #[serde(default)]
    trace: Option<bool>,
}

impl From<RawRuleSummary> for RuleSummary {
    fn from(raw: RawRuleSummary) -> Self {
        let status = RuleState::from_value(&raw.status);
        Self {
            id: raw.id,
            name: raw.name,
            status_text: state_text(&raw.status, &status),
            status,
            tags: raw.tags,
            trace: raw.trace,
        }
    }
}

/// The engine's own wording; numeric codes render as the parsed state.
fn state_text(raw: &Value, parsed: &RuleState) -> String {
    match raw {
        Value::String(s) => s.clone(),
        _ => parsed.to_string(),
    }
}

fn unknown_state() -> RuleState {
    RuleState::Unknown(String::new())
}

/// Full rule definition (`GET /rules/{id}`, `POST /rules` body).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDefinition {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub sql: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub actions: Vec<Map<String, Value>>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Map::is_empty"
    )]
    pub options: Map<String, Value>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered: Option<bool>,
}

/// Parsed `GET /rules/{id}/status`.
///
/// The engine returns a flat object with a `status` key and a large number
/// of metric keys; metrics are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleStatus {
    pub state: RuleState,
    /// `status` exactly as reported
    pub status_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub metrics: Map<String, Value>,
}

impl RuleStatus {
    #[must_use]
    pub fn from_value(raw: Value) -> Self {
        let mut metrics = match raw {
            Value::Object(map) => map,
            Value::String(s) => {
                return Self {
                    state: RuleState::parse(&s),
                    status_text: s,
                    message: None,
                    metrics: Map::new(),
                };
            }
            _ => Map::new(),
        };
        let raw_status = metrics.remove("status").unwrap_or(Value::Null);
        let state = RuleState::from_value(&raw_status);
        let status_text = state_text(&raw_status, &state);
        let message = metrics
            .remove("message")
            .and_then(|v| v.as_str().map(ToString::to_string));
        Self {
            state,
            status_text,
            message,
            metrics,
        }
    }
}

/// `GET /rules/{id}/topo`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleTopology {
    #[serde(default, deserialize_with = "null_as_default")]
    pub sources: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub edges: Map<String, Value>,
}

/// Body for `PATCH`/`DELETE /rules/{id}/tags`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTags {
    pub tags: Vec<String>,
}
