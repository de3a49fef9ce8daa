//! Storage configuration for the usage database.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `REVIEWDESK_DB_PATH` | `reviewdesk_usage.db` | SQLite file holding the call log |
//! | `REVIEWDESK_DB_BUSY_TIMEOUT_MS` | 5000 | Wait on a locked database before failing |

use std::path::PathBuf;
use std::time::Duration;

/// Default database file name.
pub const DEFAULT_DB_PATH: &str = "reviewdesk_usage.db";

/// Default busy timeout for SQLite connections.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,

    /// How long a connection waits on a locked database.
    pub busy_timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }
}

impl StorageConfig {
    /// Create configuration from environment variables.
    ///
    /// Falls back to defaults for any unset variables.
    pub fn from_env() -> Self {
        Self {
            db_path: PathBuf::from(env_parse(
                "REVIEWDESK_DB_PATH",
                DEFAULT_DB_PATH.to_string(),
            )),
            busy_timeout: Duration::from_millis(env_parse(
                "REVIEWDESK_DB_BUSY_TIMEOUT_MS",
                DEFAULT_BUSY_TIMEOUT_MS,
            )),
        }
    }

    /// Set the database path.
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    /// Set the busy timeout.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.db_path.as_os_str().is_empty() {
            return Err("db_path must not be empty".to_string());
        }
        if self.busy_timeout.is_zero() {
            return Err("busy_timeout must be > 0".to_string());
        }
        Ok(())
    }
}

/// Parse an environment variable with a default fallback.
pub fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = StorageConfig::default();
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(
            config.busy_timeout,
            Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = StorageConfig::default()
            .with_db_path("/tmp/usage.db")
            .with_busy_timeout(Duration::from_secs(1));

        assert_eq!(config.db_path, PathBuf::from("/tmp/usage.db"));
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_validate_zero_busy_timeout() {
        let config = StorageConfig::default().with_busy_timeout(Duration::ZERO);
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("busy_timeout"));
    }

    #[test]
    fn test_validate_empty_path() {
        let config = StorageConfig::default().with_db_path("");
        assert!(config.validate().unwrap_err().contains("db_path"));
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        std::env::set_var("REVIEWDESK_DB_PATH", "/var/lib/reviewdesk/usage.db");
        std::env::set_var("REVIEWDESK_DB_BUSY_TIMEOUT_MS", "250");

        let config = StorageConfig::from_env();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/reviewdesk/usage.db"));
        assert_eq!(config.busy_timeout, Duration::from_millis(250));

        std::env::remove_var("REVIEWDESK_DB_PATH");
        std::env::remove_var("REVIEWDESK_DB_BUSY_TIMEOUT_MS");
    }

    #[test]
    #[serial]
    fn test_from_env_ignores_unparseable_values() {
        std::env::set_var("REVIEWDESK_DB_BUSY_TIMEOUT_MS", "soon");
        let config = StorageConfig::from_env();
        assert_eq!(
            config.busy_timeout,
            Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS)
        );
        std::env::remove_var("REVIEWDESK_DB_BUSY_TIMEOUT_MS");
    }
}
