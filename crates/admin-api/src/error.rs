//! Error types for the admin API
//!
//! Handlers return `Result<_, ApiError>`; the error renders as a JSON body
//! with `error` and `request_id` so operators can correlate it with logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reviewdesk_tmdb_client::TmdbError;
use reviewdesk_usage_core::UsageError;
use serde::{Deserialize, Serialize};

/// Errors raised while serving an admin request
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// Bad input from the client
    #[error("{0}")]
    BadRequest(String),

    /// The catalog call failed; primary path errors surface to the caller
    #[error(transparent)]
    Upstream(#[from] TmdbError),

    /// The usage database failed on a read path
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// A blocking task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for AdminError {
    fn from(err: tokio::task::JoinError) -> Self {
        AdminError::Task(err.to_string())
    }
}

impl AdminError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AdminError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AdminError::Upstream(TmdbError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            AdminError::Upstream(e) if e.is_upstream() => StatusCode::BAD_GATEWAY,
            AdminError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AdminError::Usage(UsageError::ValidationError(_)) => StatusCode::BAD_REQUEST,
            AdminError::Usage(_) | AdminError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Attach the request id, producing a renderable error
    pub fn with_request_id(self, request_id: impl Into<String>) -> ApiError {
        ApiError {
            error: self,
            request_id: request_id.into(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub request_id: String,
}

/// [`AdminError`] tagged with the id of the request that produced it
#[derive(Debug)]
pub struct ApiError {
    pub error: AdminError,
    pub request_id: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.error.status_code();

        let message = if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
            tracing::error!(
                request_id = %self.request_id,
                error = %self.error,
                "Admin request failed"
            );
            "Internal server error. Please contact support with the request ID.".to_string()
        } else {
            tracing::warn!(
                request_id = %self.request_id,
                status = status.as_u16(),
                error = %self.error,
                "Admin request rejected"
            );
            self.error.to_string()
        };

        (
            status,
            Json(ErrorResponse {
                error: message,
                request_id: self.request_id,
            }),
        )
            .into_response()
    }
}
