use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the console module (`modules.console`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsoleConfig {
    #[serde(default = "default_proxy_timeout_secs")]
    pub proxy_timeout_secs: u64,
    #[serde(default = "default_max_body_size_bytes")]
    pub max_body_size_bytes: usize,
    /// Interval of the background health monitor; `0` disables it.
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
    /// Settings file, relative to the home directory unless absolute.
    #[serde(default = "default_settings_file")]
    pub settings_file: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            proxy_timeout_secs: default_proxy_timeout_secs(),
            max_body_size_bytes: default_max_body_size_bytes(),
            health_check_interval_secs: default_health_check_interval_secs(),
            settings_file: default_settings_file(),
        }
    }
}

impl ConsoleConfig {
    #[must_use]
    pub const fn proxy_timeout(&self) -> Duration {
        Duration::from_secs(self.proxy_timeout_secs)
    }

    /// `None` when the monitor is disabled.
    #[must_use]
    pub const fn health_check_interval(&self) -> Option<Duration> {
        if self.health_check_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.health_check_interval_secs))
        }
    }
}

fn default_proxy_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_bytes() -> usize {
    10 * 1024 * 1024 // 10 MB
}

fn default_health_check_interval_secs() -> u64 {
    30
}

fn default_settings_file() -> String {
    "settings.json".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_section_uses_defaults() {
        let cfg: ConsoleConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.proxy_timeout_secs, 30);
        assert_eq!(cfg.max_body_size_bytes, 10 * 1024 * 1024);
        assert_eq!(cfg.settings_file, "settings.json");
        assert_eq!(cfg.health_check_interval(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn zero_interval_disables_monitor() {
        let cfg: ConsoleConfig =
            serde_json::from_str(r#"{"health_check_interval_secs": 0}"#).unwrap();
        assert_eq!(cfg.health_check_interval(), None);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = serde_json::from_str::<ConsoleConfig>(r#"{"proxy_timeout": 5}"#).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }
}
