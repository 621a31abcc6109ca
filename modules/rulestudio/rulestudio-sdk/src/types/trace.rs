use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::envelope::null_as_default;

/// One span of a rule trace (`GET /trace/{id}`).
///
/// The engine serialises spans in PascalCase; both casings are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceSpan {
    #[serde(alias = "Name", default)]
    pub name: String,
    #[serde(alias = "TraceID", alias = "traceID", default)]
    pub trace_id: String,
    #[serde(alias = "SpanID", alias = "spanID", default)]
    pub span_id: String,
    #[serde(alias = "ParentSpanID", alias = "parentSpanID", default)]
    pub parent_span_id: String,
    #[serde(alias = "Attribute", default, deserialize_with = "null_as_default")]
    pub attribute: Map<String, Value>,
    #[serde(alias = "StartTime", default)]
    pub start_time: Option<Value>,
    #[serde(alias = "EndTime", default)]
    pub end_time: Option<Value>,
    #[serde(alias = "ChildSpan", default, deserialize_with = "null_as_default")]
    pub child_span: Vec<TraceSpan>,
}

impl TraceSpan {
    /// Flatten the span tree depth first, children cleared.
    #[must_use]
    pub fn flatten(self) -> Vec<Self> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(mut span) = stack.pop() {
            let children = std::mem::take(&mut span.child_span);
            out.push(span);
            stack.extend(children.into_iter().rev());
        }
        out
    }
}
