//! Local settings: registered engines, saved queries, activity log and preferences

pub mod model;
pub mod store;

pub use model::{
    ActivityEntry, AppSettings, MAX_ACTIVITY_ENTRIES, NewQuery, NewServer, SETTINGS_VERSION,
    SavedQuery, ServerConnection, ServerStatus, ServerUpdate, SettingsDocument, SettingsUpdate,
    Theme,
};
pub use store::SettingsStore;
