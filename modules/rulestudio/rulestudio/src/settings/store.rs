//! JSON settings file, read at open and rewritten after every mutation

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rulestudio_sdk::target::normalize_absolute;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::model::{
    ActivityEntry, AppSettings, NewQuery, NewServer, SETTINGS_VERSION, SavedQuery,
    ServerConnection, ServerStatus, ServerUpdate, SettingsDocument, SettingsUpdate,
};
use crate::error::ConsoleError;

type Result<T> = std::result::Result<T, ConsoleError>;

/// Settings store backed by one JSON file.
///
/// Mutations run under an async mutex against a copy of the document; the
/// in-memory state is replaced only once the file write succeeded.
pub struct SettingsStore {
    path: PathBuf,
    doc: Mutex<SettingsDocument>,
}

impl SettingsStore {
    /// Open the store, starting from defaults when the file does not exist.
    ///
    /// # Errors
    /// Returns [`ConsoleError::Storage`] when the file is unreadable, malformed
    /// or written by an unknown format version.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let doc = match tokio::fs::read(&path).await {
            Ok(bytes) => parse_document(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "Settings file not found, starting with defaults");
                SettingsDocument::default()
            }
            Err(e) => {
                return Err(ConsoleError::Storage(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };
        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the whole document.
    pub async fn snapshot(&self) -> SettingsDocument {
        self.doc.lock().await.clone()
    }

    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut SettingsDocument) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.doc.lock().await;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        write_document(&self.path, &next).await?;
        *guard = next;
        Ok(out)
    }

    // -- servers --

    pub async fn list_servers(&self) -> Vec<ServerConnection> {
        self.doc.lock().await.servers.clone()
    }

    /// # Errors
    /// [`ConsoleError::NotFound`] for an unknown id.
    pub async fn get_server(&self, id: &str) -> Result<ServerConnection> {
        self.doc
            .lock()
            .await
            .server(id)
            .cloned()
            .ok_or_else(|| ConsoleError::not_found("server", id))
    }

    /// Register an engine. The first server registered becomes active.
    ///
    /// # Errors
    /// [`ConsoleError::Validation`] for an empty name or a non-absolute URL,
    /// [`ConsoleError::Conflict`] when the URL is already registered.
    pub async fn add_server(&self, new: NewServer) -> Result<ServerConnection> {
        let name = required("name", &new.name)?;
        let url = server_url(&new.url)?;
        self.mutate(|doc| {
            ensure_unique_url(doc, &url, None)?;
            let server = ServerConnection {
                id: Uuid::new_v4().to_string(),
                name,
                url,
                status: ServerStatus::Unknown,
                last_checked: None,
                description: non_blank(new.description),
            };
            doc.servers.push(server.clone());
            if doc.settings.active_server_id.is_none() {
                doc.settings.active_server_id = Some(server.id.clone());
            }
            doc.push_activity(activity("server.add", &server.name, Some(&server.url)));
            Ok(server)
        })
        .await
    }

    /// Apply a partial update. Changing the URL resets the status.
    ///
    /// # Errors
    /// Same as [`Self::add_server`], plus [`ConsoleError::NotFound`].
    pub async fn update_server(&self, id: &str, update: ServerUpdate) -> Result<ServerConnection> {
        let name = update.name.as_deref().map(|n| required("name", n)).transpose()?;
        let url = update.url.as_deref().map(server_url).transpose()?;
        self.mutate(|doc| {
            if let Some(url) = &url {
                ensure_unique_url(doc, url, Some(id))?;
            }
            let server = doc
                .server_mut(id)
                .ok_or_else(|| ConsoleError::not_found("server", id))?;
            if let Some(name) = name {
                server.name = name;
            }
            if let Some(url) = url
                && url != server.url
            {
                server.url = url;
                server.status = ServerStatus::Unknown;
                server.last_checked = None;
            }
            if update.description.is_some() {
                server.description = non_blank(update.description);
            }
            let server = server.clone();
            doc.push_activity(activity("server.update", &server.name, None));
            Ok(server)
        })
        .await
    }

    /// Remove a server, clearing the active selection if it pointed there.
    ///
    /// # Errors
    /// [`ConsoleError::NotFound`] for an unknown id.
    pub async fn remove_server(&self, id: &str) -> Result<ServerConnection> {
        self.mutate(|doc| {
            let idx = doc
                .servers
                .iter()
                .position(|s| s.id == id)
                .ok_or_else(|| ConsoleError::not_found("server", id))?;
            let removed = doc.servers.remove(idx);
            if doc.settings.active_server_id.as_deref() == Some(id) {
                doc.settings.active_server_id = None;
            }
            doc.push_activity(activity("server.remove", &removed.name, None));
            Ok(removed)
        })
        .await
    }

    /// Record a health check result.
    ///
    /// # Errors
    /// [`ConsoleError::NotFound`] for an unknown id.
    pub async fn set_server_status(
        &self,
        id: &str,
        status: ServerStatus,
        checked_at: DateTime<Utc>,
    ) -> Result<ServerConnection> {
        self.mutate(|doc| {
            let server = doc
                .server_mut(id)
                .ok_or_else(|| ConsoleError::not_found("server", id))?;
            server.status = status;
            server.last_checked = Some(checked_at);
            Ok(server.clone())
        })
        .await
    }

    /// # Errors
    /// [`ConsoleError::NotFound`] for an unknown id.
    pub async fn set_active_server(&self, id: &str) -> Result<AppSettings> {
        self.mutate(|doc| {
            let name = doc
                .server(id)
                .map(|s| s.name.clone())
                .ok_or_else(|| ConsoleError::not_found("server", id))?;
            doc.settings.active_server_id = Some(id.to_owned());
            doc.push_activity(activity("server.activate", &name, None));
            Ok(doc.settings.clone())
        })
        .await
    }

    /// The active server, if one is selected and still registered.
    pub async fn active_server(&self) -> Option<ServerConnection> {
        let doc = self.doc.lock().await;
        let id = doc.settings.active_server_id.as_deref()?;
        doc.server(id).cloned()
    }

    // -- saved queries --

    pub async fn list_queries(&self) -> Vec<SavedQuery> {
        self.doc.lock().await.queries.clone()
    }

    /// # Errors
    /// [`ConsoleError::Validation`] for an empty name or SQL text.
    pub async fn add_query(&self, new: NewQuery) -> Result<SavedQuery> {
        let name = required("name", &new.name)?;
        let sql = required("sql", &new.sql)?;
        self.mutate(|doc| {
            let query = SavedQuery {
                id: Uuid::new_v4().to_string(),
                name,
                sql,
                created_at: Utc::now(),
            };
            doc.queries.push(query.clone());
            doc.push_activity(activity("query.save", &query.name, None));
            Ok(query)
        })
        .await
    }

    /// # Errors
    /// [`ConsoleError::NotFound`] for an unknown id.
    pub async fn remove_query(&self, id: &str) -> Result<SavedQuery> {
        self.mutate(|doc| {
            let idx = doc
                .queries
                .iter()
                .position(|q| q.id == id)
                .ok_or_else(|| ConsoleError::not_found("query", id))?;
            let removed = doc.queries.remove(idx);
            doc.push_activity(activity("query.remove", &removed.name, None));
            Ok(removed)
        })
        .await
    }

    // -- activity --

    /// Append to the activity log.
    ///
    /// # Errors
    /// [`ConsoleError::Storage`] when the file cannot be written.
    pub async fn append_activity(
        &self,
        action: &str,
        target: &str,
        detail: Option<&str>,
    ) -> Result<ActivityEntry> {
        self.mutate(|doc| {
            let entry = activity(action, target, detail);
            doc.push_activity(entry.clone());
            Ok(entry)
        })
        .await
    }

    /// Most recent entries first.
    pub async fn recent_activity(&self, limit: Option<usize>) -> Vec<ActivityEntry> {
        let doc = self.doc.lock().await;
        doc.activity
            .iter()
            .rev()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    // -- app settings --

    pub async fn settings(&self) -> AppSettings {
        self.doc.lock().await.settings.clone()
    }

    /// # Errors
    /// [`ConsoleError::Validation`] for zero intervals or an empty language.
    pub async fn update_settings(&self, update: SettingsUpdate) -> Result<AppSettings> {
        if update.request_timeout_secs == Some(0) {
            return Err(ConsoleError::Validation(
                "request_timeout_secs must be positive".into(),
            ));
        }
        if update.metrics_poll_interval_secs == Some(0) {
            return Err(ConsoleError::Validation(
                "metrics_poll_interval_secs must be positive".into(),
            ));
        }
        let language = update
            .language
            .as_deref()
            .map(|l| required("language", l))
            .transpose()?;
        self.mutate(|doc| {
            let settings = &mut doc.settings;
            if let Some(v) = update.request_timeout_secs {
                settings.request_timeout_secs = v;
            }
            if let Some(v) = update.metrics_poll_interval_secs {
                settings.metrics_poll_interval_secs = v;
            }
            if let Some(theme) = update.theme {
                settings.theme = theme;
            }
            if let Some(language) = language {
                settings.language = language;
            }
            Ok(settings.clone())
        })
        .await
    }
}

fn parse_document(bytes: &[u8]) -> Result<SettingsDocument> {
    let doc: SettingsDocument = serde_json::from_slice(bytes)
        .map_err(|e| ConsoleError::Storage(format!("malformed settings file: {e}")))?;
    if doc.version != SETTINGS_VERSION {
        return Err(ConsoleError::Storage(format!(
            "unsupported settings version {} (expected {SETTINGS_VERSION})",
            doc.version
        )));
    }
    Ok(doc)
}

async fn write_document(path: &Path, doc: &SettingsDocument) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = serde_json::to_vec_pretty(doc)
        .map_err(|e| ConsoleError::Storage(format!("cannot encode settings: {e}")))?;
    let temp_path = path.with_extension("json.tmp");
    tokio::fs::write(&temp_path, bytes).await?;
    tokio::fs::rename(&temp_path, path).await?;
    debug!(path = %path.display(), "Settings written");
    Ok(())
}

fn activity(action: &str, target: &str, detail: Option<&str>) -> ActivityEntry {
    ActivityEntry {
        id: Uuid::new_v4().to_string(),
        timestamp: Utc::now(),
        action: action.to_owned(),
        target: target.to_owned(),
        detail: detail.map(str::to_owned),
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConsoleError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_owned())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn server_url(raw: &str) -> Result<String> {
    normalize_absolute(raw).map_err(|e| ConsoleError::Validation(e.message()))
}

fn ensure_unique_url(doc: &SettingsDocument, url: &str, except: Option<&str>) -> Result<()> {
    let taken = doc
        .servers
        .iter()
        .any(|s| s.url == url && Some(s.id.as_str()) != except);
    if taken {
        return Err(ConsoleError::Conflict(format!(
            "a server with URL {url} is already registered"
        )));
    }
    Ok(())
}
