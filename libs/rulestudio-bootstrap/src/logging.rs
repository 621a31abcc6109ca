//! Tracing subscriber setup driven by the `logging` config sections.
//!
//! The `default` section sets console and file levels for every target;
//! other keys are crate prefixes that override levels and may route their
//! records to a file of their own. `RUST_LOG`, when set, caps everything.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use file_rotate::compression::Compression;
use file_rotate::suffix::{AppendTimestamp, FileLimit};
use file_rotate::{ContentLimit, FileRotate};
use parking_lot::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{DEFAULT_SECTION, LoggingConfig, Section};

const DEFAULT_MAX_SIZE_MB: u64 = 100;
const DEFAULT_MAX_BACKUPS: usize = 3;

/// Chatty HTTP internals, held at WARN unless a section says otherwise.
const NOISY_CRATES: &[&str] = &["h2", "hyper_util", "reqwest"];

static CONSOLE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

fn matches_crate_prefix(target: &str, crate_name: &str) -> bool {
    target
        .strip_prefix(crate_name)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

#[derive(Clone)]
struct LogFile(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl LogFile {
    fn open(path: &Path, section: &Section) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let max_bytes = section
            .max_size_mb
            .unwrap_or(DEFAULT_MAX_SIZE_MB)
            .saturating_mul(1024 * 1024);
        let max_bytes = usize::try_from(max_bytes).unwrap_or(usize::MAX);
        let backups = section.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS);

        let rotate = FileRotate::new(
            path,
            AppendTimestamp::default(FileLimit::MaxFiles(backups)),
            ContentLimit::BytesSurpassed(max_bytes),
            Compression::None,
            None,
        );
        Ok(Self(Arc::new(Mutex::new(rotate))))
    }
}

/// Writer for one record; `None` swallows it.
struct FileHandle(Option<LogFile>);

impl Write for FileHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &self.0 {
            Some(file) => file.0.lock().write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &self.0 {
            Some(file) => file.0.lock().flush(),
            None => Ok(()),
        }
    }
}

/// Picks the file of the longest matching crate prefix, else the default file.
#[derive(Clone, Default)]
struct FileRouter {
    default: Option<LogFile>,
    by_prefix: Vec<(String, LogFile)>,
}

impl FileRouter {
    fn build(cfg: &LoggingConfig, base_dir: &Path) -> Self {
        let mut router = Self::default();
        for (name, section) in cfg {
            let Some(path) = section.file().map(|f| resolve_log_path(f, base_dir)) else {
                continue;
            };
            let file = match LogFile::open(&path, section) {
                Ok(file) => file,
                Err(e) => {
                    report_init_problem(&format!(
                        "failed to open log file {} for '{name}': {e}",
                        path.display()
                    ));
                    continue;
                }
            };
            if name == DEFAULT_SECTION {
                router.default = Some(file);
            } else {
                router.by_prefix.push((name.clone(), file));
            }
        }
        router
            .by_prefix
            .sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));
        router
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_prefix.is_empty()
    }

    fn resolve(&self, target: &str) -> Option<LogFile> {
        self.by_prefix
            .iter()
            .find(|(prefix, _)| matches_crate_prefix(target, prefix))
            .map(|(_, file)| file)
            .or(self.default.as_ref())
            .cloned()
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = FileHandle;

    fn make_writer(&'a self) -> Self::Writer {
        FileHandle(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        FileHandle(self.resolve(meta.target()))
    }
}

fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

#[allow(clippy::print_stderr)]
fn report_init_problem(msg: &str) {
    eprintln!("logging: {msg}");
}

fn to_filter(level: Option<tracing::Level>) -> LevelFilter {
    level.map_or(LevelFilter::OFF, LevelFilter::from_level)
}

fn console_targets(cfg: &LoggingConfig) -> Targets {
    let default = cfg
        .get(DEFAULT_SECTION)
        .map_or(LevelFilter::INFO, |s| to_filter(s.console_level));

    let mut targets = Targets::new().with_default(default);
    for name in NOISY_CRATES {
        targets = targets.with_target(*name, LevelFilter::WARN);
    }
    for (name, section) in cfg.iter().filter(|(k, _)| k.as_str() != DEFAULT_SECTION) {
        targets = targets.with_target(name.clone(), to_filter(section.console_level));
    }
    targets
}

fn file_targets(cfg: &LoggingConfig) -> Targets {
    let default = cfg
        .get(DEFAULT_SECTION)
        .map_or(LevelFilter::OFF, |s| to_filter(s.file_level()));

    let mut targets = Targets::new().with_default(default);
    for (name, section) in cfg.iter().filter(|(k, _)| k.as_str() != DEFAULT_SECTION) {
        if let Some(level) = section.file_level() {
            targets = targets.with_target(name.clone(), LevelFilter::from_level(level));
        }
    }
    targets
}

fn stderr_supports_ansi() -> bool {
    _ = enable_ansi_support::enable_ansi_support();
    supports_color::on(supports_color::Stream::Stderr).is_some_and(|level| level.has_basic)
}

/// Install the global subscriber. Relative log file paths resolve against
/// `base_dir`. A second call is a no-op.
pub fn init_logging(cfg: &LoggingConfig, base_dir: &Path) {
    if let Err(e) = tracing_log::LogTracer::init() {
        report_init_problem(&format!("log bridge skipped: {e}"));
    }

    let env = EnvFilter::try_from_default_env().ok();
    let console_json = cfg.get(DEFAULT_SECTION).is_some_and(|s| s.json);

    let (stderr, guard) = tracing_appender::non_blocking(io::stderr());
    _ = CONSOLE_GUARD.set(guard);

    let console_text = (!console_json).then(|| {
        fmt::layer()
            .with_writer(stderr.clone())
            .with_ansi(stderr_supports_ansi())
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_filter(console_targets(cfg))
    });
    let console_structured = console_json.then(|| {
        fmt::layer()
            .json()
            .with_writer(stderr)
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_filter(console_targets(cfg))
    });

    let router = FileRouter::build(cfg, base_dir);
    let file = (!router.is_empty()).then(|| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(router)
            .with_filter(file_targets(cfg))
    });

    let subscriber = Registry::default()
        .with(env)
        .with(console_text)
        .with(console_structured)
        .with(file);
    _ = subscriber.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    fn section(console: Option<Level>, file: &str) -> Section {
        Section {
            console_level: console,
            file: file.to_owned(),
            ..Section::default()
        }
    }

    #[test]
    fn crate_prefix_matches_whole_path_segments() {
        assert!(matches_crate_prefix("rulestudio", "rulestudio"));
        assert!(matches_crate_prefix("rulestudio::proxy", "rulestudio"));
        assert!(!matches_crate_prefix("rulestudio_sdk::client", "rulestudio"));
    }

    #[test]
    fn router_prefers_longest_prefix_then_default() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = LoggingConfig::new();
        cfg.insert(DEFAULT_SECTION.into(), section(Some(Level::INFO), "main.log"));
        cfg.insert("rulestudio".into(), section(None, "console.log"));
        cfg.insert("rulestudio::proxy".into(), section(None, "proxy.log"));
        cfg.insert("rulestudio_sdk".into(), section(None, ""));

        let router = FileRouter::build(&cfg, dir.path());
        assert_eq!(router.by_prefix.len(), 2);
        assert_eq!(router.by_prefix[0].0, "rulestudio::proxy");

        let proxy = router.resolve("rulestudio::proxy::service").unwrap();
        assert!(Arc::ptr_eq(&proxy.0, &router.by_prefix[0].1.0));
        let sdk = router.resolve("rulestudio_sdk::client").unwrap();
        assert!(Arc::ptr_eq(&sdk.0, &router.default.as_ref().unwrap().0));
    }

    #[test]
    fn sections_without_file_leave_router_empty() {
        let mut cfg = LoggingConfig::new();
        cfg.insert(DEFAULT_SECTION.into(), section(Some(Level::INFO), ""));
        assert!(FileRouter::build(&cfg, Path::new("/nonexistent")).is_empty());
    }

    #[test]
    fn file_handle_without_file_discards() {
        let mut handle = FileHandle(None);
        assert_eq!(handle.write(b"dropped").unwrap(), 7);
        handle.flush().unwrap();
    }
}
