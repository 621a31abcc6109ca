//! Stream and table definitions as described by the engine.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ClientError, Result};

/// Source definition kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Unbounded stream of events
    Stream,
    /// Lookup or scan table
    Table,
}

impl SourceKind {
    /// Collection path segment (`streams` / `tables`)
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Stream => "streams",
            Self::Table => "tables",
        }
    }

    /// SQL keyword (`STREAM` / `TABLE`)
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Stream => "STREAM",
            Self::Table => "TABLE",
        }
    }
}

/// Column type of a stream field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    Bigint,
    Float,
    String,
    Bytea,
    Datetime,
    Boolean,
    Array { element: Box<FieldType> },
    Struct { fields: Vec<StreamField> },
    /// Anything the engine reports that is not a known type
    Unknown { raw: std::string::String },
}

impl FieldType {
    /// Map the engine's numeric type code.
    #[must_use]
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Bigint,
            2 => Self::Float,
            3 => Self::String,
            4 => Self::Bytea,
            5 => Self::Datetime,
            6 => Self::Boolean,
            7 => Self::Array {
                element: Box::new(Self::Unknown { raw: String::new() }),
            },
            8 => Self::Struct { fields: Vec::new() },
            other => Self::Unknown {
                raw: other.to_string(),
            },
        }
    }

    /// Map a type name in any casing.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "bigint" | "int" | "integer" => Self::Bigint,
            "float" | "double" => Self::Float,
            "string" | "strings" => Self::String,
            "bytea" => Self::Bytea,
            "datetime" => Self::Datetime,
            "boolean" | "bool" => Self::Boolean,
            "array" => Self::Array {
                element: Box::new(Self::Unknown { raw: String::new() }),
            },
            "struct" => Self::Struct { fields: Vec::new() },
            _ => Self::Unknown {
                raw: name.to_string(),
            },
        }
    }

    /// Parse the engine's field type, which is a code, a name, or an object
    /// `{Type, ElemType, StreamFields}` for compound types.
    ///
    /// # Errors
    /// Returns [`ClientError::InvalidResponse`] for malformed nested fields.
    pub fn from_value(raw: &Value) -> Result<Self> {
        match raw {
            Value::Number(n) => Ok(Self::from_code(n.as_i64().unwrap_or(0))),
            Value::String(s) => Ok(Self::from_name(s)),
            Value::Object(map) => {
                let base = match get_any(map, &["Type", "type"]) {
                    Some(inner) => Self::from_value(inner)?,
                    None => Self::Unknown { raw: String::new() },
                };
                match base {
                    Self::Array { .. } => {
                        let element = match get_any(map, &["ElemType", "elemType", "elem_type"]) {
                            Some(elem) => Self::from_value(elem)?,
                            None => Self::Unknown { raw: String::new() },
                        };
                        Ok(Self::Array {
                            element: Box::new(element),
                        })
                    }
                    Self::Struct { .. } => Ok(Self::Struct {
                        fields: parse_fields(get_any(map, &["StreamFields", "streamFields", "fields"]))?,
                    }),
                    other => Ok(other),
                }
            }
            Value::Null => Ok(Self::Unknown { raw: String::new() }),
            other => Err(ClientError::InvalidResponse(format!(
                "unsupported field type: {other}"
            ))),
        }
    }
}

impl fmt::Display for FieldType {
    /// Render as an engine SQL type.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bigint => f.write_str("BIGINT"),
            Self::Float => f.write_str("FLOAT"),
            Self::String => f.write_str("STRING"),
            Self::Bytea => f.write_str("BYTEA"),
            Self::Datetime => f.write_str("DATETIME"),
            Self::Boolean => f.write_str("BOOLEAN"),
            Self::Array { element } => match element.as_ref() {
                Self::Unknown { raw } if raw.is_empty() => f.write_str("ARRAY"),
                inner => write!(f, "ARRAY({inner})"),
            },
            Self::Struct { fields } => {
                f.write_str("STRUCT(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{} {}", field.name, field.field_type)?;
                }
                f.write_str(")")
            }
            Self::Unknown { raw } if raw.is_empty() => f.write_str("STRING"),
            Self::Unknown { raw } => f.write_str(&raw.to_ascii_uppercase()),
        }
    }
}

/// One column in a stream schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamField {
    pub name: String,
    pub field_type: FieldType,
}

/// Structured definition of a stream or table.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StreamDetails {
    pub name: String,
    pub fields: Vec<StreamField>,
    /// Options exactly as returned, keys in whatever case the engine used
    pub options: Map<String, Value>,
    /// Original statement, when the engine echoes it back
    pub statement: Option<String>,
}

impl StreamDetails {
    /// Parse a `GET /streams/{name}` style response.
    ///
    /// Keys are accepted in PascalCase or camelCase.
    ///
    /// # Errors
    /// Returns [`ClientError::InvalidResponse`] if the body is not an object
    /// or contains malformed fields.
    pub fn from_value(raw: &Value) -> Result<Self> {
        let map = raw.as_object().ok_or_else(|| {
            ClientError::InvalidResponse("stream details must be a JSON object".into())
        })?;

        let name = get_any(map, &["Name", "name"])
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let fields = parse_fields(get_any(map, &["StreamFields", "streamFields", "fields", "Fields"]))?;

        let options = match get_any(map, &["Options", "options"]) {
            Some(Value::Object(opts)) => opts.clone(),
            _ => Map::new(),
        };

        let statement = get_any(map, &["Statement", "statement"])
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string);

        Ok(Self {
            name,
            fields,
            options,
            statement,
        })
    }
}

fn get_any<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| map.get(*k))
}

fn parse_fields(raw: Option<&Value>) -> Result<Vec<StreamField>> {
    let Some(Value::Array(items)) = raw else {
        return Ok(Vec::new());
    };
    items
        .iter()
        .map(|item| {
            let obj = item.as_object().ok_or_else(|| {
                ClientError::InvalidResponse("stream field must be a JSON object".into())
            })?;
            let name = get_any(obj, &["Name", "name"])
                .and_then(Value::as_str)
                .ok_or_else(|| ClientError::InvalidResponse("stream field without name".into()))?
                .to_string();
            let field_type = match get_any(obj, &["FieldType", "fieldType", "type", "Type"]) {
                Some(t) => FieldType::from_value(t)?,
                None => FieldType::Unknown { raw: String::new() },
            };
            Ok(StreamField { name, field_type })
        })
        .collect()
}
