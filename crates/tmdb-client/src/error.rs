//! Error types for TMDB calls

use reviewdesk_usage_core::UsageError;

/// Errors returned by [`crate::TmdbClient`]
#[derive(Debug, thiserror::Error)]
pub enum TmdbError {
    /// TMDB answered with a non-success status or could not be reached
    #[error("TMDB unavailable at {endpoint}: {reason}")]
    UpstreamUnavailable {
        endpoint: String,
        status: Option<u16>,
        reason: String,
    },

    /// TMDB answered 2xx but the body did not match the expected shape
    #[error("Failed to decode TMDB response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("Invalid TMDB URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] UsageError),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl TmdbError {
    /// Whether the failure came from the remote side rather than the caller
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            TmdbError::UpstreamUnavailable { .. } | TmdbError::Decode { .. }
        )
    }

    /// HTTP status TMDB answered with, if it answered at all
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            TmdbError::UpstreamUnavailable { status, .. } => *status,
            _ => None,
        }
    }

    pub(crate) fn status(endpoint: &str, status: reqwest::StatusCode) -> Self {
        TmdbError::UpstreamUnavailable {
            endpoint: endpoint.to_string(),
            status: Some(status.as_u16()),
            reason: format!("HTTP {}", status),
        }
    }

    // reqwest errors carry the request URL, which includes the api key
    pub(crate) fn transport(endpoint: &str, err: reqwest::Error) -> Self {
        let reason = if err.is_timeout() {
            "request timed out".to_string()
        } else {
            err.without_url().to_string()
        };
        TmdbError::UpstreamUnavailable {
            endpoint: endpoint.to_string(),
            status: None,
            reason,
        }
    }

    pub(crate) fn decode(endpoint: &str, err: reqwest::Error) -> Self {
        TmdbError::Decode {
            endpoint: endpoint.to_string(),
            reason: err.without_url().to_string(),
        }
    }
}

/// Result type for TMDB calls
pub type Result<T> = std::result::Result<T, TmdbError>;
