//! Admin API server configuration
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PORT` | 8080 | Listen port |
//! | `REVIEWDESK_STATUS_ERROR_CAPACITY` | 10 | Recent status errors kept in memory |
//! | `REVIEWDESK_UTC_OFFSET_MINUTES` | host offset | Service timezone, minutes east of UTC |
//! | `REVIEWDESK_STATS_WINDOW_DAYS` | 30 | Default daily series length |
//! | `REVIEWDESK_STATS_TOP_N` | 5 | Default number of ranked movies |
//!
//! Storage, TMDB and recorder settings are read by their own `from_env`.

use crate::recorder::RecorderConfig;
use reviewdesk_tmdb_client::TmdbConfig;
use reviewdesk_usage_core::{validation, ServiceClock};
use reviewdesk_usage_storage::StorageConfig;

pub use reviewdesk_usage_storage::config::env_parse;

/// Default listen port
pub const DEFAULT_PORT: u16 = 8080;

/// Default capacity of the recent status error buffer
pub const DEFAULT_ERROR_CAPACITY: usize = 10;

/// Default daily series length
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Default number of ranked movies
pub const DEFAULT_TOP_N: usize = 5;

/// Full server configuration
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub port: u16,
    pub storage: StorageConfig,
    pub tmdb: TmdbConfig,
    pub recorder: RecorderConfig,
    pub error_capacity: usize,
    /// Service timezone override; `None` uses the host offset
    pub utc_offset_minutes: Option<i32>,
    pub window_days: u32,
    pub top_n: usize,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            storage: StorageConfig::default(),
            tmdb: TmdbConfig::default(),
            recorder: RecorderConfig::default(),
            error_capacity: DEFAULT_ERROR_CAPACITY,
            utc_offset_minutes: None,
            window_days: DEFAULT_WINDOW_DAYS,
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl AdminConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            storage: StorageConfig::from_env(),
            tmdb: TmdbConfig::from_env(),
            recorder: RecorderConfig::from_env(),
            error_capacity: env_parse("REVIEWDESK_STATUS_ERROR_CAPACITY", DEFAULT_ERROR_CAPACITY),
            utc_offset_minutes: std::env::var("REVIEWDESK_UTC_OFFSET_MINUTES")
                .ok()
                .and_then(|v| v.trim().parse().ok()),
            window_days: env_parse("REVIEWDESK_STATS_WINDOW_DAYS", DEFAULT_WINDOW_DAYS),
            top_n: env_parse("REVIEWDESK_STATS_TOP_N", DEFAULT_TOP_N),
        }
    }

    /// Clock for the configured service timezone
    pub fn clock(&self) -> ServiceClock {
        self.utc_offset_minutes
            .and_then(ServiceClock::from_offset_minutes)
            .unwrap_or_else(ServiceClock::local)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        self.storage.validate()?;
        self.tmdb.validate()?;
        self.recorder.validate()?;

        if self.error_capacity == 0 {
            return Err("error_capacity must be > 0".to_string());
        }
        if let Some(minutes) = self.utc_offset_minutes {
            if ServiceClock::from_offset_minutes(minutes).is_none() {
                return Err(format!("utc offset out of range: {} minutes", minutes));
            }
        }
        validation::validate_window_days(self.window_days).map_err(|e| e.to_string())?;
        validation::validate_top_n(self.top_n).map_err(|e| e.to_string())?;

        Ok(())
    }
}
