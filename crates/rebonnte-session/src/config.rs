//! # Session Configuration
//!
//! Configuration for a Rebonnte session: where the database lives, how the
//! pool is sized and how long stock taps are batched.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     REBONNTE_DATABASE_PATH=/data/rebonnte.db                           │
//! │     REBONNTE_DEBOUNCE_MS=500                                           │
//! │     REBONNTE_MAX_CONNECTIONS=8                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/rebonnte/session.toml (Linux)                            │
//! │     ~/Library/Application Support/fr.rebonnte.pharmacy/session.toml    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     1000 ms debounce, 5 connections                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # session.toml
//! database_path = "/var/lib/rebonnte/rebonnte.db"
//! debounce_ms = 1000
//! max_connections = 5
//! subscription_buffer = 16
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};
use rebonnte_core::DEFAULT_DEBOUNCE_MS;
use rebonnte_db::DbConfig;

/// Accepted debounce window, in milliseconds.
const DEBOUNCE_RANGE_MS: std::ops::RangeInclusive<u64> = 50..=60_000;

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("fr", "rebonnte", "pharmacy")
}

fn default_database_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("rebonnte.db"))
        .unwrap_or_else(|| PathBuf::from("rebonnte.db"))
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_max_connections() -> u32 {
    5
}

fn default_subscription_buffer() -> usize {
    16
}

// =============================================================================
// Session Configuration
// =============================================================================

/// Complete session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Quiet period after the last stock tap before the batch is written.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Snapshots buffered per live subscription.
    #[serde(default = "default_subscription_buffer")]
    pub subscription_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            database_path: default_database_path(),
            debounce_ms: default_debounce_ms(),
            max_connections: default_max_connections(),
            subscription_buffer: default_subscription_buffer(),
        }
    }
}

impl SessionConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (session.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SessionResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading session config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
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
            warn!("Failed to load session config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SessionResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SessionError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Session config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SessionResult<()> {
        if !DEBOUNCE_RANGE_MS.contains(&self.debounce_ms) {
            return Err(SessionError::Config(format!(
                "debounce_ms must be between {} and {}, got {}",
                DEBOUNCE_RANGE_MS.start(),
                DEBOUNCE_RANGE_MS.end(),
                self.debounce_ms
            )));
        }

        if self.max_connections == 0 {
            return Err(SessionError::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.database_path.as_os_str().is_empty() {
            return Err(SessionError::Config("database_path must not be empty".into()));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("REBONNTE_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database_path = PathBuf::from(path);
        }

        if let Ok(value) = std::env::var("REBONNTE_DEBOUNCE_MS") {
            match value.parse::<u64>() {
                Ok(ms) => {
                    debug!(debounce_ms = ms, "Overriding debounce from environment");
                    self.debounce_ms = ms;
                }
                Err(_) => warn!(value = %value, "Invalid REBONNTE_DEBOUNCE_MS in environment"),
            }
        }

        if let Ok(value) = std::env::var("REBONNTE_MAX_CONNECTIONS") {
            match value.parse::<u32>() {
                Ok(max) => self.max_connections = max,
                Err(_) => warn!(value = %value, "Invalid REBONNTE_MAX_CONNECTIONS in environment"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("session.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Debounce window as a `Duration`.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Database configuration derived from this session config.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .subscription_buffer(self.subscription_buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.debounce_ms, 1000);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.subscription_buffer, 16);
        assert!(config.database_path.ends_with("rebonnte.db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SessionConfig::default();

        config.debounce_ms = 10;
        assert!(config.validate().is_err());

        config.debounce_ms = 60_001;
        assert!(config.validate().is_err());

        config.debounce_ms = 50;
        assert!(config.validate().is_ok());

        config.max_connections = 0;
        assert!(matches!(config.validate(), Err(SessionError::Config(_))));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SessionConfig = toml::from_str("debounce_ms = 250").unwrap();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.subscription_buffer, 16);
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let dir = std::env::temp_dir().join(format!("rebonnte-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("session.toml");

        let config = SessionConfig {
            database_path: dir.join("pharmacy.db"),
            debounce_ms: 400,
            max_connections: 3,
            subscription_buffer: 8,
        };
        config.save(Some(path.clone())).unwrap();

        let loaded = SessionConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.debounce_ms, 400);
        assert_eq!(loaded.max_connections, 3);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_db_config() {
        let config = SessionConfig {
            database_path: PathBuf::from("/tmp/rebonnte-test.db"),
            debounce_ms: 1000,
            max_connections: 7,
            subscription_buffer: 4,
        };

        let db_config = config.db_config();
        assert_eq!(db_config.database_path, PathBuf::from("/tmp/rebonnte-test.db"));
        assert_eq!(db_config.max_connections, 7);
        assert_eq!(db_config.subscription_buffer, 4);
        assert_eq!(config.debounce(), Duration::from_millis(1000));
    }
}
