use std::env;
use std::path::{Path, PathBuf};

/// Errors for resolving configured paths
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("user home directory cannot be determined")]
    HomeMissing,
    #[error("path '{path}' is invalid: {source}")]
    Invalid {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Directory the default `home_dir` lives in.
#[must_use]
pub fn user_home_dir() -> PathBuf {
    dirs::home_dir()
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(env::temp_dir)
}

/// Expand a leading `~` to the user home directory.
///
/// # Errors
/// Returns [`PathError::HomeMissing`] if the home directory is unknown.
pub fn expand_tilde(raw: &str) -> Result<PathBuf, PathError> {
    if raw == "~" {
        return dirs::home_dir().ok_or(PathError::HomeMissing);
    }
    match raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        Some(rest) => Ok(dirs::home_dir().ok_or(PathError::HomeMissing)?.join(rest)),
        None => Ok(PathBuf::from(raw)),
    }
}

/// Make a configured path absolute: `~` is expanded, relative paths are
/// resolved against the current directory.
///
/// # Errors
/// Returns [`PathError`] if the path cannot be resolved.
pub fn normalize_path(raw: &Path) -> Result<PathBuf, PathError> {
    let expanded = expand_tilde(&raw.to_string_lossy())?;
    if expanded.is_absolute() {
        return Ok(expanded);
    }
    std::path::absolute(&expanded).map_err(|source| PathError::Invalid {
        path: expanded.display().to_string(),
        source,
    })
}
