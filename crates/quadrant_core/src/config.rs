//! Core runtime configuration.
//!
//! # Responsibility
//! - Describe where the todo database and logs live.
//! - Carry the idle grace used by matrix view subscriptions.
//!
//! # Invariants
//! - Every field has a default; an empty JSON object is a valid config.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_DB_FILE_NAME: &str = "quadrant.sqlite3";
const DEFAULT_IDLE_GRACE_MS: u64 = 5_000;

/// Config loading failure.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
        }
    }
}

/// Runtime settings for the todo core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite file holding the `todos` table.
    pub db_path: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    /// Zero-subscriber time before view live queries are released.
    pub idle_grace_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            idle_grace_ms: DEFAULT_IDLE_GRACE_MS,
        }
    }
}

impl CoreConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(ConfigError::Parse)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn idle_grace(&self) -> Duration {
        Duration::from_millis(self.idle_grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn empty_object_yields_defaults() {
        let config = CoreConfig::from_json_str("{}").expect("empty config should parse");
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.idle_grace(), Duration::from_secs(5));
        assert_eq!(config.db_path, PathBuf::from("quadrant.sqlite3"));
    }

    #[test]
    fn partial_object_overrides_fields() {
        let config = CoreConfig::from_json_str(
            r#"{"db_path": "/tmp/todos.db", "idle_grace_ms": 250, "log_level": "warn"}"#,
        )
        .expect("partial config should parse");
        assert_eq!(config.db_path, PathBuf::from("/tmp/todos.db"));
        assert_eq!(config.idle_grace(), Duration::from_millis(250));
        assert_eq!(config.log_level, "warn");
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = CoreConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = CoreConfig::from_json_file("/definitely/missing/quadrant.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
