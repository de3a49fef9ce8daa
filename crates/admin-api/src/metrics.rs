//! Prometheus metrics for the ReviewDesk admin API
//!
//! This module is only compiled when the `metrics` feature is enabled.
//!
//! - `http_requests_total` - Counter for total HTTP requests
//! - `http_request_duration_seconds` - Histogram for request latencies
//! - `tmdb_calls_total` - Counter for proxied TMDB calls by operation and outcome
//! - `tmdb_usage_records_lost_total` - Counter for usage records that never reached the database
//! - `tmdb_status_check_seconds` - Histogram for connectivity probe latency

use axum::{
    extract::{MatchedPath, Request},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use std::time::Instant;

lazy_static! {
    /// Counter for total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// Histogram for HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latency in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    /// Counter for TMDB calls (search, popular, detail)
    pub static ref TMDB_CALLS_TOTAL: CounterVec = register_counter_vec!(
        "tmdb_calls_total",
        "Total number of TMDB calls made on behalf of clients",
        &["operation", "status"]
    )
    .unwrap();

    /// Counter for usage records dropped before or during the write
    pub static ref TMDB_USAGE_RECORDS_LOST_TOTAL: CounterVec = register_counter_vec!(
        "tmdb_usage_records_lost_total",
        "Usage records that were not persisted",
        &["reason"]
    )
    .unwrap();

    /// Histogram for connectivity probe duration
    pub static ref TMDB_STATUS_CHECK_SECONDS: HistogramVec = register_histogram_vec!(
        "tmdb_status_check_seconds",
        "TMDB connectivity probe latency in seconds",
        &["connected"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();
}

/// Axum middleware to track HTTP request metrics
pub async fn track_metrics(req: Request, next: Next) -> impl IntoResponse {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let response = next.run(req).await;
    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &path])
        .observe(duration);

    response
}

/// Handler for the `/metrics` endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", encoder.format_type())],
            buffer,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response(),
    }
}

/// Record the outcome of a proxied TMDB call
pub fn record_tmdb_call(operation: &str, status: &str) {
    TMDB_CALLS_TOTAL.with_label_values(&[operation, status]).inc();
}

/// Record usage records that were dropped
pub fn record_usage_log_loss(reason: &str, count: usize) {
    TMDB_USAGE_RECORDS_LOST_TOTAL
        .with_label_values(&[reason])
        .inc_by(count as f64);
}

/// Record a connectivity probe
pub fn record_status_check(connected: bool, duration_secs: f64) {
    let label = if connected { "true" } else { "false" };
    TMDB_STATUS_CHECK_SECONDS
        .with_label_values(&[label])
        .observe(duration_secs);
}
