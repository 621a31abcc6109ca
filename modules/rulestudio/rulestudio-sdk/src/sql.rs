//! Regenerating `CREATE STREAM` / `CREATE TABLE` statements.
//!
//! The engine returns the structured definition of a stream but not always
//! the statement that created it. The statement produced here is equivalent
//! to the original, not identical: formatting and comments are lost, and
//! options inlined by a conf key come back as the conf key reference.

use serde_json::{Map, Value};

use crate::types::{SourceKind, StreamDetails, StreamField};

/// Options in the order they are emitted.
pub const OPTION_ORDER: [&str; 8] = [
    "TYPE",
    "DATASOURCE",
    "FORMAT",
    "CONF_KEY",
    "SHARED",
    "SCHEMAID",
    "TIMESTAMP",
    "TIMESTAMP_FORMAT",
];

/// Emitted after [`OPTION_ORDER`] for tables only.
pub const TABLE_OPTIONS: [&str; 1] = ["KIND"];

/// Build the `CREATE` statement for a definition.
///
/// The field list is always parenthesised, even when empty, because the
/// engine parser requires it. The `WITH` clause is omitted when none of
/// the known options are present.
#[must_use]
pub fn reconstruct_create_statement(kind: SourceKind, details: &StreamDetails) -> String {
    let mut sql = format!(
        "CREATE {} {} ({})",
        kind.keyword(),
        details.name,
        render_fields(&details.fields)
    );

    let extra: &[&str] = match kind {
        SourceKind::Stream => &[],
        SourceKind::Table => &TABLE_OPTIONS,
    };

    let options: Vec<String> = OPTION_ORDER
        .iter()
        .chain(extra)
        .filter_map(|key| {
            lookup_option(&details.options, key).map(|v| format!("{key}=\"{}\"", escape(&v)))
        })
        .collect();

    if !options.is_empty() {
        sql.push_str(" WITH (");
        sql.push_str(&options.join(", "));
        sql.push(')');
    }
    sql.push(';');
    sql
}

fn render_fields(fields: &[StreamField]) -> String {
    fields
        .iter()
        .map(|f| format!("{} {}", f.name, f.field_type))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Find an option by canonical upper-case key.
///
/// Tries the exact upper-case key, then the lower-case key, then any other
/// casing; the first non-empty value wins.
#[must_use]
pub fn lookup_option(options: &Map<String, Value>, key: &str) -> Option<String> {
    let lower = key.to_ascii_lowercase();
    let exact = [key, lower.as_str()]
        .into_iter()
        .filter_map(|k| options.get(k));
    let loose = options
        .iter()
        .filter(|(k, _)| k.as_str() != key && *k != &lower && k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v);

    exact.chain(loose).find_map(option_text)
}

fn option_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldType;
    use serde_json::json;

    fn details(options: Value, fields: Vec<StreamField>) -> StreamDetails {
        StreamDetails {
            name: "demo".into(),
            fields,
            options: options.as_object().cloned().unwrap_or_default(),
            statement: None,
        }
    }

    #[test]
    fn options_follow_canonical_order_in_any_casing() {
        let d = details(
            json!({
                "format": "json",
                "Timestamp": "ts",
                "TYPE": "mqtt",
                "DataSource": "topic/a",
                "shared": true
            }),
            vec![],
        );
        assert_eq!(
            reconstruct_create_statement(SourceKind::Stream, &d),
            r#"CREATE STREAM demo () WITH (TYPE="mqtt", DATASOURCE="topic/a", FORMAT="json", SHARED="true", TIMESTAMP="ts");"#
        );
    }

    #[test]
    fn empty_schema_still_has_parentheses() {
        let d = details(json!({"DATASOURCE": "t"}), vec![]);
        let sql = reconstruct_create_statement(SourceKind::Stream, &d);
        assert!(sql.starts_with("CREATE STREAM demo () WITH"));
    }

    #[test]
    fn no_known_options_means_no_with_clause() {
        let d = details(json!({"unrelated": "x", "FORMAT": ""}), vec![]);
        assert_eq!(
            reconstruct_create_statement(SourceKind::Stream, &d),
            "CREATE STREAM demo ();"
        );
    }

    #[test]
    fn first_non_empty_match_wins() {
        let opts = json!({"FORMAT": "", "format": "binary", "Format": "json"});
        assert_eq!(
            lookup_option(opts.as_object().unwrap(), "FORMAT").as_deref(),
            Some("binary")
        );
    }

    #[test]
    fn table_adds_kind_last_and_renders_fields() {
        let d = details(
            json!({"kind": "lookup", "datasource": "devices", "type": "memory"}),
            vec![
                StreamField {
                    name: "id".into(),
                    field_type: FieldType::Bigint,
                },
                StreamField {
                    name: "labels".into(),
                    field_type: FieldType::Array {
                        element: Box::new(FieldType::String),
                    },
                },
            ],
        );
        assert_eq!(
            reconstruct_create_statement(SourceKind::Table, &d),
            r#"CREATE TABLE demo (id BIGINT, labels ARRAY(STRING)) WITH (TYPE="memory", DATASOURCE="devices", KIND="lookup");"#
        );
    }

    #[test]
    fn quotes_are_escaped() {
        let d = details(json!({"DATASOURCE": "a\"b"}), vec![]);
        assert!(reconstruct_create_statement(SourceKind::Stream, &d).contains(r#"DATASOURCE="a\"b""#));
    }
}
