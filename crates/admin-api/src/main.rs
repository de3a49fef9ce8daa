//! ReviewDesk Admin API Server
//!
//! Serves TMDB usage statistics and connectivity status for the admin
//! console, and proxies catalog calls so they are counted.

use reviewdesk_admin_api::{router, spawn_recorder, AdminConfig, AppState};
use reviewdesk_tmdb_client::TmdbClient;
use reviewdesk_usage_storage::{DynUsageStore, LocalSqliteBackend, SqliteUsageStore, UsageBackend};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "ReviewDesk API failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = AdminConfig::from_env();
    config.validate()?;

    tracing::info!(db_path = ?config.storage.db_path, "Using usage database");
    if !config.tmdb.has_api_key() {
        tracing::warn!("TMDB_API_KEY is not set, catalog calls will be rejected upstream");
    }

    let backend = LocalSqliteBackend::from_config(&config.storage);
    if !backend.exists()? {
        tracing::warn!("Usage database does not exist, initializing new database");
        backend.initialize()?;
    }

    let clock = config.clock();
    tracing::info!(utc_offset = %clock.offset(), "Service timezone fixed");

    let store: Arc<DynUsageStore> = Arc::new(SqliteUsageStore::new(backend));
    let (recorder, writer) = spawn_recorder(config.recorder.clone(), clock, store.clone());
    let recorder_stats = recorder.stats();

    let tmdb = TmdbClient::new(config.tmdb.clone(), Arc::new(recorder))?;
    let state = AppState::new(tmdb, store, clock, recorder_stats)
        .with_error_capacity(config.error_capacity)
        .with_stats_defaults(config.window_days, config.top_n);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("ReviewDesk API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    // The router owns the last recorder handles; dropping it closes the channel
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Draining usage log");
    writer.await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
