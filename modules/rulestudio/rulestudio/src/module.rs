use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use tracing::info;

use crate::api::rest::routes;
use crate::config::ConsoleConfig;
use crate::error::ConsoleError;
use crate::health::{HealthChecker, HealthMonitor};
use crate::proxy::EngineProxy;
use crate::settings::SettingsStore;

/// Shared application state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub(crate) config: Arc<ConsoleConfig>,
    pub(crate) store: Arc<SettingsStore>,
    pub(crate) health: Arc<HealthChecker>,
    pub(crate) proxy: Arc<EngineProxy>,
}

impl AppState {
    /// # Errors
    /// Returns an error if the proxy HTTP client cannot be built.
    pub fn new(config: ConsoleConfig, store: SettingsStore) -> Result<Self, ConsoleError> {
        let store = Arc::new(store);
        let proxy = EngineProxy::new(config.proxy_timeout())?;
        Ok(Self {
            health: Arc::new(HealthChecker::new(Arc::clone(&store))),
            proxy: Arc::new(proxy),
            store,
            config: Arc::new(config),
        })
    }

    #[must_use]
    pub fn store(&self) -> &Arc<SettingsStore> {
        &self.store
    }

    #[must_use]
    pub fn health(&self) -> &Arc<HealthChecker> {
        &self.health
    }
}

/// Console module: opens the settings store and wires proxy, health
/// checks and routes.
pub struct ConsoleModule {
    state: AppState,
}

impl ConsoleModule {
    /// # Errors
    /// Fails when the settings file cannot be loaded.
    pub async fn init(config: ConsoleConfig, home_dir: &Path) -> anyhow::Result<Self> {
        info!("Initializing console module");
        let settings_path = resolve_settings_path(home_dir, &config.settings_file);
        let store = SettingsStore::open(settings_path.clone()).await?;
        let state = AppState::new(config, store)?;
        info!(settings = %settings_path.display(), "Console module initialized");
        Ok(Self { state })
    }

    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    #[must_use]
    pub fn router(&self) -> Router {
        info!("Registering console REST routes");
        routes::register_routes(Router::new(), self.state.clone())
    }

    /// Start the periodic health monitor, unless disabled in config.
    #[must_use]
    pub fn start_health_monitor(&self) -> Option<HealthMonitor> {
        let interval = self.state.config.health_check_interval()?;
        Some(Arc::clone(&self.state.health).spawn_monitor(interval))
    }
}

fn resolve_settings_path(home_dir: &Path, settings_file: &str) -> PathBuf {
    let path = Path::new(settings_file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        home_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_settings_file_lives_in_home() {
        assert_eq!(
            resolve_settings_path(Path::new("/var/lib/rs"), "settings.json"),
            PathBuf::from("/var/lib/rs/settings.json")
        );
        assert_eq!(
            resolve_settings_path(Path::new("/var/lib/rs"), "/etc/rs.json"),
            PathBuf::from("/etc/rs.json")
        );
    }
}
