//! Application configuration: defaults, YAML file, then `RULESTUDIO__*` environment

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::paths;

/// Environment variable prefix; `RULESTUDIO__SERVER__BIND_ADDR` maps to `server.bind_addr`.
pub const ENV_PREFIX: &str = "RULESTUDIO__";

/// Logging section applied to every target without its own section.
pub const DEFAULT_SECTION: &str = "default";

/// Main application configuration with typed global sections and a
/// per-module configuration bag.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default = "default_logging_config")]
    pub logging: LoggingConfig,
    /// `module_name` → arbitrary value, parsed by the module itself.
    #[serde(default)]
    pub modules: HashMap<String, serde_json::Value>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: default_logging_config(),
            modules: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Settings and log files live here; normalised to an absolute path.
    pub home_dir: PathBuf,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            home_dir: paths::user_home_dir().join(".rulestudio"),
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 9082))
}

impl ServerConfig {
    fn normalize_home_dir_inplace(&mut self) -> Result<()> {
        self.home_dir =
            paths::normalize_path(&self.home_dir).context("home_dir normalization failed")?;
        std::fs::create_dir_all(&self.home_dir).context("Failed to create home_dir")?;
        Ok(())
    }
}

/// Logging configuration - maps `default` or a target prefix (crate name)
/// to its settings.
pub type LoggingConfig = HashMap<String, Section>;

mod optional_level_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use tracing::Level;

    #[allow(clippy::ref_option, clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S>(level: &Option<Level>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(level.map_or("off", |l| l.as_str()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Level>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.to_lowercase().as_str() {
            "off" | "none" => Ok(None),
            other => other
                .parse::<Level>()
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("invalid level: {s}"))),
        }
    }

    #[allow(clippy::unnecessary_wraps)]
    pub fn info() -> Option<Level> {
        Some(Level::INFO)
    }

    #[allow(clippy::unnecessary_wraps)]
    pub fn debug() -> Option<Level> {
        Some(Level::DEBUG)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    #[serde(default = "optional_level_serde::info", with = "optional_level_serde")]
    pub console_level: Option<Level>,
    /// Log file, relative to `home_dir` unless absolute. Empty disables it.
    #[serde(default)]
    pub file: String,
    #[serde(default = "optional_level_serde::debug", with = "optional_level_serde")]
    pub file_level: Option<Level>,
    /// Rotate once the file grows past this size.
    #[serde(default)]
    pub max_size_mb: Option<u64>,
    /// Rotated files to keep.
    #[serde(default)]
    pub max_backups: Option<usize>,
    /// Console output as JSON lines instead of text.
    #[serde(default)]
    pub json: bool,
}

impl Default for Section {
    fn default() -> Self {
        Self {
            console_level: Some(Level::INFO),
            file: String::new(),
            file_level: Some(Level::DEBUG),
            max_size_mb: None,
            max_backups: None,
            json: false,
        }
    }
}

impl Section {
    #[must_use]
    pub fn file(&self) -> Option<&str> {
        Some(self.file.as_str()).filter(|f| !f.is_empty())
    }

    /// File level, only when a file is configured.
    #[must_use]
    pub fn file_level(&self) -> Option<Level> {
        self.file().and(self.file_level)
    }
}

/// Create a default logging configuration.
#[must_use]
pub fn default_logging_config() -> LoggingConfig {
    let mut logging = HashMap::new();
    logging.insert(
        DEFAULT_SECTION.to_owned(),
        Section {
            file: "logs/rulestudio.log".to_owned(),
            max_size_mb: Some(100),
            max_backups: Some(3),
            ..Section::default()
        },
    );
    logging
}

impl AppConfig {
    /// Load configuration with layered loading: defaults → YAML file → environment variables.
    /// Also normalizes `server.home_dir` into an absolute path and creates the directory.
    ///
    /// # Errors
    /// Returns an error if configuration loading or `home_dir` resolution fails.
    pub fn load_layered(config_path: Option<&Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Yaml},
        };

        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = config_path {
            figment = figment.merge(Yaml::file(path));
        }
        let figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut config: Self = figment
            .extract()
            .context("Failed to extract config from figment")?;

        config
            .server
            .normalize_home_dir_inplace()
            .context("Failed to resolve server.home_dir")?;

        Ok(config)
    }

    /// Load from an explicit file, or from defaults and environment.
    ///
    /// # Errors
    /// Returns an error if the file does not exist or loading fails.
    pub fn load_or_default(config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_path {
            ensure!(
                path.is_file(),
                "config file does not exist: {}",
                path.to_string_lossy()
            );
        }
        Self::load_layered(config_path)
    }

    /// Serialize configuration to YAML.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        serde_saphyr::to_string(self).context("Failed to serialize config to YAML")
    }

    /// Apply overrides from command line arguments.
    pub fn apply_cli_overrides(&mut self, verbose: u8) {
        if let Some(default_section) = self.logging.get_mut(DEFAULT_SECTION) {
            default_section.console_level = match verbose {
                0 => default_section.console_level,
                1 => Some(Level::DEBUG),
                _ => Some(Level::TRACE),
            };
        }
    }

    /// Typed view of `modules.<name>`; defaults when the module has no entry.
    ///
    /// # Errors
    /// Returns an error if the entry does not match `T`.
    pub fn module_config<T>(&self, name: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.modules.get(name) {
            None | Some(serde_json::Value::Null) => Ok(T::default()),
            Some(raw) => serde_json::from_value(raw.clone())
                .with_context(|| format!("Invalid configuration for module '{name}'")),
        }
    }
}
