//! # Service Configuration
//!
//! Settings for the database pool, order limits and logging.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BISTRO_DATABASE_PATH=/var/lib/bistro/bistro.db                     │
//! │     BISTRO_MAX_CONNECTIONS=8                                           │
//! │     BISTRO_BUSY_TIMEOUT_SECS=30                                        │
//! │     BISTRO_LOG=bistro_db=debug                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/bistro-pos/bistro.toml (Linux)                           │
//! │     ~/Library/Application Support/com.bistro.pos/bistro.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # bistro.toml
//! [database]
//! path = "bistro.db"
//! max_connections = 5
//! busy_timeout_secs = 30
//!
//! [orders]
//! max_lines_per_round = 100
//! max_line_quantity = 999
//!
//! [logging]
//! filter = "info,bistro_db=debug"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use bistro_core::validation::OrderLimits;
use bistro_core::{DEFAULT_MAX_LINES_PER_ROUND, DEFAULT_MAX_LINE_QUANTITY};

use crate::pool::DbConfig;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path. Relative paths resolve against the working directory.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Seconds to wait for a pooled connection.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Seconds a writer waits for SQLite's write lock.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("bistro.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_busy_timeout() -> u64 {
    30
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            busy_timeout_secs: default_busy_timeout(),
        }
    }
}

// =============================================================================
// Order Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSettings {
    #[serde(default = "default_max_lines")]
    pub max_lines_per_round: usize,

    #[serde(default = "default_max_quantity")]
    pub max_line_quantity: i64,
}

fn default_max_lines() -> usize {
    DEFAULT_MAX_LINES_PER_ROUND
}

fn default_max_quantity() -> i64 {
    DEFAULT_MAX_LINE_QUANTITY
}

impl Default for OrderSettings {
    fn default() -> Self {
        OrderSettings {
            max_lines_per_round: default_max_lines(),
            max_line_quantity: default_max_quantity(),
        }
    }
}

// =============================================================================
// Logging Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive string.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub orders: OrderSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (bistro.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML document. Missing sections and keys take defaults.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid(
                "database.min_connections cannot exceed max_connections".into(),
            ));
        }

        if self.database.acquire_timeout_secs == 0 || self.database.busy_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "database timeouts must be greater than 0".into(),
            ));
        }

        if self.orders.max_lines_per_round == 0 || self.orders.max_line_quantity <= 0 {
            return Err(ConfigError::Invalid(
                "order limits must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("BISTRO_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("BISTRO_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(m) => self.database.max_connections = m,
                Err(_) => warn!(value = %max, "Ignoring invalid BISTRO_MAX_CONNECTIONS"),
            }
        }

        if let Ok(secs) = std::env::var("BISTRO_BUSY_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.database.busy_timeout_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring invalid BISTRO_BUSY_TIMEOUT_SECS"),
            }
        }

        if let Ok(filter) = std::env::var("BISTRO_LOG") {
            self.logging.filter = filter;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "bistro", "pos")
            .map(|dirs| dirs.config_dir().join("bistro.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Pool settings for [`crate::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone())
            .max_connections(self.database.max_connections)
            .min_connections(self.database.min_connections)
            .connect_timeout(Duration::from_secs(self.database.acquire_timeout_secs))
            .busy_timeout(Duration::from_secs(self.database.busy_timeout_secs))
    }

    pub fn order_limits(&self) -> OrderLimits {
        OrderLimits {
            max_lines_per_round: self.orders.max_lines_per_round,
            max_line_quantity: self.orders.max_line_quantity,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.database.busy_timeout_secs, 30);
        assert_eq!(config.order_limits(), OrderLimits::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [database]
            path = "/tmp/bistro-test.db"
            max_connections = 8

            [orders]
            max_line_quantity = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/bistro-test.db"));
        assert_eq!(config.database.max_connections, 8);
        assert_eq!(config.database.busy_timeout_secs, 30);
        assert_eq!(config.orders.max_line_quantity, 50);
        assert_eq!(config.orders.max_lines_per_round, DEFAULT_MAX_LINES_PER_ROUND);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_db_config_conversion() {
        let mut config = AppConfig::default();
        config.database.busy_timeout_secs = 12;
        let db = config.db_config();
        assert_eq!(db.busy_timeout, Duration::from_secs(12));
        assert_eq!(db.max_connections, 5);
    }

    #[test]
    fn test_validation_rejects_bad_pool_sizes() {
        let mut config = AppConfig::default();
        config.database.max_connections = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.database.min_connections = 9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let err = AppConfig::from_toml("[database\npath = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
