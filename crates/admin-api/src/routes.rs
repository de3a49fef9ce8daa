//! HTTP routes for the admin API
//!
//! - `GET /health`
//! - `GET /api/admin/settings/tmdb/stats?days=30&limit=5`
//! - `GET /api/admin/settings/tmdb/status`
//! - `GET /api/tmdb/search?query=...&page=1`
//! - `GET /api/tmdb/popular?page=1`
//! - `GET /api/tmdb/movies/{id}`
//! - `GET /metrics` (feature `metrics`)
//!
//! The catalog routes proxy TMDB through a [`TmdbClient`] whose usage sink
//! is the call log recorder, so every successful proxied call is counted.

use axum::{
    body::Body,
    extract::{
        rejection::{PathRejection, QueryRejection},
        Extension, Path, Query, State,
    },
    http::{HeaderValue, Request},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use reviewdesk_tmdb_client::{Movie, MovieDetails, Page, TmdbClient, TmdbError};
use reviewdesk_usage_core::ServiceClock;
use reviewdesk_usage_storage::DynUsageStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;
use uuid::Uuid;

use crate::aggregator::UsageAggregator;
use crate::config::{DEFAULT_ERROR_CAPACITY, DEFAULT_TOP_N, DEFAULT_WINDOW_DAYS};
use crate::error::{AdminError, ApiError};
use crate::ranking::PopularityRanker;
use crate::recorder::{RecorderStats, RecorderStatsSnapshot};
use crate::stats::{collect_usage_stats, UsageStatsResponse};
use crate::status::{StatusError, StatusMonitor};

/// Header carrying the request id back to the client
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request ID for tracking requests through the system
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    tmdb: TmdbClient,
    aggregator: UsageAggregator,
    ranker: PopularityRanker,
    monitor: Arc<StatusMonitor>,
    recorder_stats: Arc<RecorderStats>,
    window_days: u32,
    top_n: usize,
}

impl AppState {
    /// Wire the read side and the status monitor around one TMDB client
    ///
    /// `tmdb` should report usage to the recorder that owns `recorder_stats`.
    pub fn new(
        tmdb: TmdbClient,
        store: Arc<DynUsageStore>,
        clock: ServiceClock,
        recorder_stats: Arc<RecorderStats>,
    ) -> Self {
        let client = Arc::new(tmdb.clone());
        Self {
            aggregator: UsageAggregator::new(store.clone(), clock),
            ranker: PopularityRanker::new(store, client.clone()),
            monitor: Arc::new(StatusMonitor::new(client, DEFAULT_ERROR_CAPACITY, clock)),
            tmdb,
            recorder_stats,
            window_days: DEFAULT_WINDOW_DAYS,
            top_n: DEFAULT_TOP_N,
        }
    }

    /// Keep up to `capacity` recent status failures
    pub fn with_error_capacity(mut self, capacity: usize) -> Self {
        let clock = *self.aggregator.clock();
        self.monitor = Arc::new(StatusMonitor::new(
            Arc::new(self.tmdb.clone()),
            capacity,
            clock,
        ));
        self
    }

    /// Defaults used when the stats request has no `days`/`limit`
    pub fn with_stats_defaults(mut self, window_days: u32, top_n: usize) -> Self {
        self.window_days = window_days;
        self.top_n = top_n;
        self
    }
}

/// Build the admin API router
pub fn router(state: AppState) -> Router {
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/admin/settings/tmdb/stats", get(usage_stats))
        .route("/api/admin/settings/tmdb/status", get(tmdb_status))
        .route("/api/tmdb/search", get(search_movies))
        .route("/api/tmdb/popular", get(popular_movies))
        .route("/api/tmdb/movies/{id}", get(movie_details));

    #[cfg(feature = "metrics")]
    let app = app
        .route("/metrics", get(crate::metrics::metrics_handler))
        .layer(middleware::from_fn(crate::metrics::track_metrics));

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Middleware to add request ID to every request and response
async fn request_id_middleware(mut req: Request<Body>, next: Next) -> Response {
    let request_id = RequestId(Uuid::new_v4().to_string());
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&request_id.0) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct StatsParams {
    days: Option<u32>,
    limit: Option<usize>,
}

/// Usage totals, daily series and most-viewed movies
async fn usage_stats(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    params: Result<Query<StatsParams>, QueryRejection>,
) -> Result<Json<UsageStatsResponse>, ApiError> {
    let Query(params) = params.map_err(|e| bad_request(&request_id, e.body_text()))?;

    let stats = collect_usage_stats(
        &state.aggregator,
        &state.ranker,
        params.days.unwrap_or(state.window_days),
        params.limit.unwrap_or(state.top_n),
    )
    .await
    .map_err(|e| e.with_request_id(request_id.0.clone()))?;

    Ok(Json(stats))
}

/// Body of the status endpoint
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub success: bool,
    pub response_time_ms: u64,
    pub checked_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Most recent failures first
    pub recent_errors: Vec<StatusError>,
    /// Call log health counters
    pub usage_log: RecorderStatsSnapshot,
}

/// Live TMDB connectivity check
async fn tmdb_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let report = state.monitor.check_status().await;

    Json(StatusResponse {
        success: report.connected,
        response_time_ms: report.response_time_ms,
        checked_at: report.checked_at,
        error: report.error,
        recent_errors: state.monitor.recent_errors(),
        usage_log: state.recorder_stats.snapshot(),
    })
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PageParams {
    page: Option<u32>,
}

/// Search TMDB by title
async fn search_movies(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Page<Movie>>, ApiError> {
    let Query(params) = params.map_err(|e| bad_request(&request_id, e.body_text()))?;
    let result = state
        .tmdb
        .search(&params.query, params.page.unwrap_or(1))
        .await;
    tmdb_response("search", result, &request_id)
}

/// Popular movies in the configured region
async fn popular_movies(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Page<Movie>>, ApiError> {
    let Query(params) = params.map_err(|e| bad_request(&request_id, e.body_text()))?;
    let result = state.tmdb.popular(params.page.unwrap_or(1)).await;
    tmdb_response("popular", result, &request_id)
}

/// Details for one movie
async fn movie_details(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MovieDetails>, ApiError> {
    let Path(id) = id.map_err(|e| bad_request(&request_id, e.body_text()))?;
    let result = state.tmdb.movie_details(id).await;
    tmdb_response("detail", result, &request_id)
}

fn tmdb_response<T>(
    operation: &str,
    result: Result<T, TmdbError>,
    request_id: &RequestId,
) -> Result<Json<T>, ApiError> {
    #[cfg(feature = "metrics")]
    crate::metrics::record_tmdb_call(operation, if result.is_ok() { "success" } else { "error" });

    match result {
        Ok(value) => {
            debug!(operation, request_id = %request_id.0, "TMDB call served");
            Ok(Json(value))
        }
        Err(e) => Err(AdminError::from(e).with_request_id(request_id.0.clone())),
    }
}

fn bad_request(request_id: &RequestId, message: String) -> ApiError {
    AdminError::BadRequest(message).with_request_id(request_id.0.clone())
}
