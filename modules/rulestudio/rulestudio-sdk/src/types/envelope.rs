//! Normalisation of list responses.
//!
//! Engine versions disagree on list shapes: some return a bare array, some
//! wrap it as `{"value": [...]}` or `{"data": [...]}`. Items may be plain
//! names or objects. Everything is folded into `Vec<Value>` here so callers
//! see one shape.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{ClientError, Result};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListEnvelope {
    Bare(Vec<Value>),
    Value { value: Vec<Value> },
    Data { data: Vec<Value> },
}

/// Extract the list items from any supported envelope.
///
/// `null` and `{}` are treated as an empty list.
///
/// # Errors
/// Returns [`ClientError::InvalidResponse`] for any other shape.
pub fn list_items(raw: Value) -> Result<Vec<Value>> {
    match raw {
        Value::Null => return Ok(Vec::new()),
        Value::Object(ref map) if map.is_empty() => return Ok(Vec::new()),
        Value::Object(ref map)
            if matches!(map.get("value").or_else(|| map.get("data")), Some(Value::Null)) =>
        {
            return Ok(Vec::new());
        }
        _ => {}
    }

    let shape = describe(&raw);
    match serde_json::from_value::<ListEnvelope>(raw) {
        Ok(ListEnvelope::Bare(items))
        | Ok(ListEnvelope::Value { value: items })
        | Ok(ListEnvelope::Data { data: items }) => Ok(items),
        Err(_) => Err(ClientError::InvalidResponse(format!(
            "expected a list, got {shape}"
        ))),
    }
}

/// Name of a list item: the string itself, or its `name`/`Name`/`id` field.
#[must_use]
pub fn item_name(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => ["name", "Name", "id", "Id", "ID"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .map(ToString::to_string),
        _ => None,
    }
}

/// Normalise a list response of names or named objects into names.
///
/// Items without a recognisable name are skipped.
///
/// # Errors
/// Returns [`ClientError::InvalidResponse`] when the envelope is not a list.
pub fn normalize_names(raw: Value) -> Result<Vec<String>> {
    Ok(list_items(raw)?.iter().filter_map(item_name).collect())
}

/// Field deserializer that reads `null` as the default value.
///
/// The engine encodes empty slices and maps as `null`; pair with
/// `#[serde(default)]` so a missing key behaves the same.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn all_envelopes_normalise_to_same_names() {
        let expected = vec!["a".to_string(), "b".to_string()];
        assert_eq!(normalize_names(json!(["a", "b"])).unwrap(), expected);
        assert_eq!(normalize_names(json!({"value": ["a", "b"]})).unwrap(), expected);
        assert_eq!(
            normalize_names(json!({"data": [{"name": "a"}, {"id": "b"}]})).unwrap(),
            expected
        );
    }

    #[test]
    fn empty_shapes() {
        assert!(list_items(Value::Null).unwrap().is_empty());
        assert!(list_items(json!({})).unwrap().is_empty());
        assert!(list_items(json!({"value": null})).unwrap().is_empty());
    }

    #[test]
    fn non_list_is_rejected() {
        let err = list_items(json!("oops")).unwrap_err();
        assert!(err.to_string().contains("a string"));
        assert!(list_items(json!({"other": 1})).is_err());
    }

    #[test]
    fn nameless_items_are_skipped() {
        assert_eq!(
            normalize_names(json!([{"name": "x"}, 3, {"k": "v"}])).unwrap(),
            vec!["x".to_string()]
        );
    }
}
