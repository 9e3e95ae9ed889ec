//! Runtime configuration.
//!
//! # Responsibility
//! - Describe everything needed to wire a repository: database location,
//!   logging, metadata fetch behavior, search options.
//! - Read overrides from `LINKSHELF_*` environment variables.
//!
//! # Invariants
//! - `Default` is usable as is: in-memory database, no file logging.
//! - Invalid values are rejected, never silently ignored, whether they come
//!   from the environment or from a JSON file.

use crate::db::DbError;
use crate::logging::{default_log_level, normalize_level};
use crate::metadata::FetchError;
use crate::repo::resource_store::StoreError;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "LINKSHELF_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "LINKSHELF_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "LINKSHELF_LOG_DIR";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "LINKSHELF_FETCH_TIMEOUT_SECS";
pub const ENV_USER_AGENT: &str = "LINKSHELF_USER_AGENT";
pub const ENV_SEARCH_CASE_INSENSITIVE: &str = "LINKSHELF_SEARCH_CASE_INSENSITIVE";

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_USER_AGENT: &str = concat!("linkshelf/", env!("CARGO_PKG_VERSION"));

/// Repository wiring configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LinkshelfConfig {
    /// SQLite file; `None` keeps everything in memory.
    pub database_path: Option<PathBuf>,
    pub log_level: String,
    /// Absolute directory for rolling log files; `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    pub case_insensitive_search: bool,
}

impl Default for LinkshelfConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            case_insensitive_search: false,
        }
    }
}

impl LinkshelfConfig {
    /// Builds a config from process environment variables over defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup over defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let read = |key: &'static str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(path) = read(ENV_DB_PATH) {
            config.database_path = Some(PathBuf::from(path));
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = read(ENV_FETCH_TIMEOUT_SECS) {
            config.fetch_timeout_secs = match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: ENV_FETCH_TIMEOUT_SECS,
                        value: raw,
                        expected: "a positive number of seconds",
                    })
                }
            };
        }
        if let Some(agent) = read(ENV_USER_AGENT) {
            config.user_agent = agent;
        }
        if let Some(raw) = read(ENV_SEARCH_CASE_INSENSITIVE) {
            config.case_insensitive_search = parse_flag(&raw).ok_or(ConfigError::InvalidValue {
                key: ENV_SEARCH_CASE_INSENSITIVE,
                value: raw,
                expected: "true|false|1|0",
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parses a JSON config document; absent fields keep their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that every loading path must agree on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if normalize_level(&self.log_level).is_err() {
            return Err(ConfigError::InvalidValue {
                key: "log_level",
                value: self.log_level.clone(),
                expected: "trace|debug|info|warn|error",
            });
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "fetch_timeout_secs",
                value: self.fetch_timeout_secs.to_string(),
                expected: "a positive number of seconds",
            });
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "user_agent",
                value: self.user_agent.clone(),
                expected: "a non-empty user agent",
            });
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Invalid configuration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
    /// Config document is not valid JSON for [`LinkshelfConfig`].
    Parse(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue {
                key,
                value,
                expected,
            } => write!(f, "invalid value `{value}` for {key}; expected {expected}"),
            Self::Parse(message) => write!(f, "invalid config document: {message}"),
        }
    }
}

impl Error for ConfigError {}

/// Failure while wiring a repository from configuration.
#[derive(Debug)]
pub enum BootstrapError {
    Config(ConfigError),
    Db(DbError),
    Store(StoreError),
    Fetcher(FetchError),
}

impl Display for BootstrapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "failed to open database: {err}"),
            Self::Store(err) => write!(f, "failed to initialize resource store: {err}"),
            Self::Fetcher(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BootstrapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Fetcher(err) => Some(err),
        }
    }
}

impl From<ConfigError> for BootstrapError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for BootstrapError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<StoreError> for BootstrapError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<FetchError> for BootstrapError {
    fn from(value: FetchError) -> Self {
        Self::Fetcher(value)
    }
}
