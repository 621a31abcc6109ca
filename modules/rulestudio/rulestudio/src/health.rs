//! Engine reachability checks

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use rulestudio_sdk::{ClientConfig, ClientError, EngineClient};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::ConsoleError;
use crate::settings::{ServerConnection, ServerStatus, SettingsStore};

/// Timeout of a single `/ping`.
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Pings registered engines and records the outcome in the settings store.
pub struct HealthChecker {
    store: Arc<SettingsStore>,
    ping_timeout: Duration,
}

impl HealthChecker {
    #[must_use]
    pub fn new(store: Arc<SettingsStore>) -> Self {
        Self {
            store,
            ping_timeout: DEFAULT_PING_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout = timeout;
        self
    }

    /// Ping one engine without touching the store.
    pub async fn probe(&self, url: &str) -> ServerStatus {
        let result = match ClientConfig::direct(url) {
            Ok(config) => match EngineClient::new(config.timeout(self.ping_timeout)) {
                Ok(client) => client.system().ping().await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        classify(&result)
    }

    /// Ping the server with `id` and persist its new status.
    ///
    /// # Errors
    /// [`ConsoleError::NotFound`] for an unknown id, storage errors otherwise.
    pub async fn check(&self, id: &str) -> Result<ServerConnection, ConsoleError> {
        let server = self.store.get_server(id).await?;
        let status = self.probe(&server.url).await;
        debug!(server = %server.name, url = %server.url, ?status, "Health check");
        self.store.set_server_status(id, status, Utc::now()).await
    }

    /// Check every registered server concurrently.
    ///
    /// Servers removed while the pings were in flight are skipped.
    ///
    /// # Errors
    /// Storage errors while recording results.
    pub async fn check_all(&self) -> Result<Vec<ServerConnection>, ConsoleError> {
        let servers = self.store.list_servers().await;
        let statuses = join_all(servers.iter().map(|s| self.probe(&s.url))).await;

        let mut updated = Vec::with_capacity(servers.len());
        for (server, status) in servers.iter().zip(statuses) {
            match self.store.set_server_status(&server.id, status, Utc::now()).await {
                Ok(record) => updated.push(record),
                Err(ConsoleError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(updated)
    }

    /// Run [`Self::check_all`] every `interval` until the monitor is stopped.
    #[must_use]
    pub fn spawn_monitor(self: Arc<Self>, interval: Duration) -> HealthMonitor {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval = ?interval, "Health monitor started");
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.check_all().await {
                            warn!(error = %e, "Health check round failed");
                        }
                    }
                }
            }
            info!("Health monitor stopped");
        });
        HealthMonitor {
            stop: Some(stop_tx),
            task: Some(task),
        }
    }
}

/// Map a ping result to a status.
#[must_use]
pub fn classify(result: &Result<(), ClientError>) -> ServerStatus {
    match result {
        Ok(()) => ServerStatus::Connected,
        Err(e) if e.is_timeout() || e.is_unreachable() => ServerStatus::Disconnected,
        Err(_) => ServerStatus::Error,
    }
}

/// Background health monitor. Aborted when dropped.
pub struct HealthMonitor {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl HealthMonitor {
    /// Stop and wait for the current round to finish.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
