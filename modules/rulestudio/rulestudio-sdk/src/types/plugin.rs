use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Plugin category, also the path segment under `/plugins`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    Sources,
    Sinks,
    Functions,
    Portables,
}

impl PluginKind {
    pub const ALL: [Self; 4] = [Self::Sources, Self::Sinks, Self::Functions, Self::Portables];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sources => "sources",
            Self::Sinks => "sinks",
            Self::Functions => "functions",
            Self::Portables => "portables",
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginKind {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ClientError::BuildError(format!("unknown plugin kind '{s}'")))
    }
}

/// Body for `POST /plugins/{kind}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSpec {
    pub name: String,
    /// URL of the plugin zip
    pub file: String,
    #[serde(default, rename = "shellParas", skip_serializing_if = "Vec::is_empty")]
    pub shell_params: Vec<String>,
    /// Function names exported by a `functions` plugin
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<String>,
}
