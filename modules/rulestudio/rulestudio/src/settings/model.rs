//! Records persisted in the settings file

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current settings file format.
pub const SETTINGS_VERSION: u32 = 1;

/// Activity log entries kept, newest last.
pub const MAX_ACTIVITY_ENTRIES: usize = 200;

/// Last known reachability of an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Connected,
    Disconnected,
    Error,
    #[default]
    Unknown,
}

/// An engine the operator registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConnection {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub status: ServerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body of a create request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewServer {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update; absent fields are left as they are.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedQuery {
    pub id: String,
    pub name: String,
    pub sql: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewQuery {
    pub name: String,
    pub sql: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

/// Console preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub active_server_id: Option<String>,
    pub request_timeout_secs: u64,
    pub metrics_poll_interval_secs: u64,
    pub theme: Theme,
    pub language: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            active_server_id: None,
            request_timeout_secs: 30,
            metrics_poll_interval_secs: 5,
            theme: Theme::default(),
            language: "en".to_owned(),
        }
    }
}

/// Partial settings update. The active server is changed through
/// activation only.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub metrics_poll_interval_secs: Option<u64>,
    #[serde(default)]
    pub theme: Option<Theme>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Whole settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsDocument {
    pub version: u32,
    #[serde(default)]
    pub servers: Vec<ServerConnection>,
    #[serde(default)]
    pub queries: Vec<SavedQuery>,
    #[serde(default)]
    pub activity: VecDeque<ActivityEntry>,
    #[serde(default)]
    pub settings: AppSettings,
}

impl Default for SettingsDocument {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            servers: Vec::new(),
            queries: Vec::new(),
            activity: VecDeque::new(),
            settings: AppSettings::default(),
        }
    }
}

impl SettingsDocument {
    pub(crate) fn server(&self, id: &str) -> Option<&ServerConnection> {
        self.servers.iter().find(|s| s.id == id)
    }

    pub(crate) fn server_mut(&mut self, id: &str) -> Option<&mut ServerConnection> {
        self.servers.iter_mut().find(|s| s.id == id)
    }

    /// Append, dropping the oldest entries beyond the cap.
    pub(crate) fn push_activity(&mut self, entry: ActivityEntry) {
        self.activity.push_back(entry);
        while self.activity.len() > MAX_ACTIVITY_ENTRIES {
            self.activity.pop_front();
        }
    }
}
