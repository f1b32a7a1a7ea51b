use std::env;

use crate::logging::LogConfig;

pub const DB_URL_VAR: &str = "RETENTION_DB_URL";
pub const LOG_LEVEL_VAR: &str = "RETENTION_LOG_LEVEL";

pub const DEFAULT_DB_URL: &str = "sqlite:retention.sqlite3";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Runtime settings for the services layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub db_url: String,
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl ServiceConfig {
    /// Read settings from the environment, loading `.env` first when present.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            db_url: non_blank(DB_URL_VAR).unwrap_or(defaults.db_url),
            log_level: non_blank(LOG_LEVEL_VAR).unwrap_or(defaults.log_level),
        }
    }

    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            log_level: self.log_level.clone(),
            ..LogConfig::default()
        }
    }
}
