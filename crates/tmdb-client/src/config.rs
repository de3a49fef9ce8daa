//! TMDB client configuration.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TMDB_API_KEY` | (empty) | v3 API key sent as the `api_key` query parameter |
//! | `TMDB_API_BASE_URL` | `https://api.themoviedb.org/3` | API root |
//! | `TMDB_LANGUAGE` | `ko-KR` | `language` parameter for every call |
//! | `TMDB_REGION` | `KR` | `region` parameter for search and listings |
//! | `TMDB_TIMEOUT_SECS` | 10 | Per-request timeout |

use std::fmt;
use std::time::Duration;

/// Default TMDB API root.
pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Default response language.
pub const DEFAULT_LANGUAGE: &str = "ko-KR";

/// Default release region.
pub const DEFAULT_REGION: &str = "KR";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// TMDB client configuration.
#[derive(Clone)]
pub struct TmdbConfig {
    /// API key; never logged.
    pub api_key: String,

    /// API root, without trailing slash.
    pub base_url: String,

    /// `language` query parameter.
    pub language: String,

    /// `region` query parameter.
    pub region: String,

    /// Whether search may return adult titles.
    pub include_adult: bool,

    /// Timeout for a single request.
    pub timeout: Duration,
}

impl fmt::Debug for TmdbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TmdbConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("language", &self.language)
            .field("region", &self.region)
            .field("include_adult", &self.include_adult)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            region: DEFAULT_REGION.to_string(),
            include_adult: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl TmdbConfig {
    /// Create configuration from environment variables.
    ///
    /// Falls back to defaults for any unset variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("TMDB_API_KEY").unwrap_or_default(),
            base_url: std::env::var("TMDB_API_BASE_URL").unwrap_or(defaults.base_url),
            language: std::env::var("TMDB_LANGUAGE").unwrap_or(defaults.language),
            region: std::env::var("TMDB_REGION").unwrap_or(defaults.region),
            include_adult: false,
            timeout: Duration::from_secs(
                std::env::var("TMDB_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Set the API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        url::Url::parse(&self.base_url).map_err(|e| format!("base_url is invalid: {}", e))?;
        if self.timeout.is_zero() {
            return Err("timeout must be > 0".to_string());
        }
        if self.language.is_empty() {
            return Err("language must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TmdbConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.language, "ko-KR");
        assert_eq!(config.region, "KR");
        assert!(!config.include_adult);
        assert!(!config.has_api_key());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = TmdbConfig::default().with_api_key("super-secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let config = TmdbConfig::default().with_base_url("not a url");
        assert!(config.validate().unwrap_err().contains("base_url"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = TmdbConfig::default().with_timeout(Duration::ZERO);
        assert!(config.validate().unwrap_err().contains("timeout"));
    }
}
