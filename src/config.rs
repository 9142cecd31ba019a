//! Environment-driven configuration.
//!
//! | Variable               | Default   |
//! |------------------------|-----------|
//! | `HPKP_DATABASE_PATH`   | `hpkp.db` |
//! | `HPKP_BUSY_TIMEOUT_MS` | `5000`    |
//! | `HPKP_JOURNAL_WAL`     | `true`    |
//! | `HPKP_WORKERS`         | `4`       |

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const ENV_DATABASE_PATH: &str = "HPKP_DATABASE_PATH";
pub const ENV_BUSY_TIMEOUT_MS: &str = "HPKP_BUSY_TIMEOUT_MS";
pub const ENV_JOURNAL_WAL: &str = "HPKP_JOURNAL_WAL";
pub const ENV_WORKERS: &str = "HPKP_WORKERS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Where and how the report store is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub database_path: PathBuf,
    /// How long a writer waits on a locked database before failing.
    pub busy_timeout: Duration,
    pub journal_wal: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("hpkp.db"),
            busy_timeout: Duration::from_millis(5000),
            journal_wal: true,
        }
    }
}

impl StoreConfig {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DATABASE_PATH) {
            config.database_path = PathBuf::from(path);
        }
        if let Some(ms) = lookup(ENV_BUSY_TIMEOUT_MS) {
            let ms: u64 = ms.trim().parse().map_err(|_| ConfigError::Invalid {
                key: ENV_BUSY_TIMEOUT_MS,
                value: ms.clone(),
            })?;
            config.busy_timeout = Duration::from_millis(ms);
        }
        if let Some(wal) = lookup(ENV_JOURNAL_WAL) {
            config.journal_wal = parse_bool(ENV_JOURNAL_WAL, &wal)?;
        }

        Ok(config)
    }
}

/// Size of the ingestion worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    pub workers: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        match lookup(ENV_WORKERS) {
            None => Ok(Self::default()),
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(workers) if workers > 0 => Ok(Self { workers }),
                _ => Err(ConfigError::Invalid {
                    key: ENV_WORKERS,
                    value: raw,
                }),
            },
        }
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
        }),
    }
}
