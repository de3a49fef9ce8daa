//! ReviewDesk Admin API Library
//!
//! TMDB usage accounting for the admin console: the call log recorder,
//! the read-side aggregator and ranker, the connectivity status monitor
//! and the axum routes that expose them.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod ranking;
pub mod recorder;
pub mod routes;
pub mod stats;
pub mod status;

#[cfg(feature = "metrics")]
pub mod metrics;

pub use aggregator::UsageAggregator;
pub use config::AdminConfig;
pub use error::{AdminError, ApiError, ErrorResponse};
pub use ranking::{PopularityRanker, RankedSubject};
pub use recorder::{spawn_recorder, CallLogRecorder, RecorderConfig, RecorderStats};
pub use routes::{router, AppState, RequestId};
pub use stats::{collect_usage_stats, UsageStatsResponse};
pub use status::{ErrorBuffer, StatusMonitor, StatusReport};
