//! Best-effort call log for outbound TMDB requests
//!
//! Every catalog call that counts as real usage hands a [`UsageRecord`] to
//! the [`CallLogRecorder`]. The recorder never blocks and never fails its
//! caller:
//! - Records go onto a bounded channel with `try_send`
//! - A background task drains the channel and appends in batches
//! - A full buffer, a closed channel or a failed append drops the record,
//!   logs it under the `usage_fallback` target and bumps a counter
//!
//! There are no retries: a lost usage record is acceptable, a slowed or
//! failed catalog request is not.
//!
//! ## Configuration
//!
//! - `REVIEWDESK_USAGE_BUFFER_SIZE`: Max records waiting to be written (default: 1000)
//! - `REVIEWDESK_USAGE_FLUSH_INTERVAL_MS`: Flush interval in milliseconds (default: 1000)
//! - `REVIEWDESK_USAGE_MAX_BATCH`: Records per transaction (default: 100)

use reviewdesk_usage_core::{CallKind, ServiceClock, UsageRecord, UsageSink};
use reviewdesk_usage_storage::DynUsageStore;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Default buffer size for pending usage records
const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Default flush interval in milliseconds
const DEFAULT_FLUSH_INTERVAL_MS: u64 = 1000;

/// Default number of records written per transaction
const DEFAULT_MAX_BATCH: usize = 100;

/// Configuration for the call log recorder
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Maximum number of records waiting in the channel
    pub buffer_size: usize,
    /// Flush interval in milliseconds
    pub flush_interval_ms: u64,
    /// Flush as soon as this many records are pending
    pub max_batch: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            max_batch: DEFAULT_MAX_BATCH,
        }
    }
}

impl RecorderConfig {
    pub fn from_env() -> Self {
        Self {
            buffer_size: crate::config::env_parse(
                "REVIEWDESK_USAGE_BUFFER_SIZE",
                DEFAULT_BUFFER_SIZE,
            ),
            flush_interval_ms: crate::config::env_parse(
                "REVIEWDESK_USAGE_FLUSH_INTERVAL_MS",
                DEFAULT_FLUSH_INTERVAL_MS,
            ),
            max_batch: crate::config::env_parse("REVIEWDESK_USAGE_MAX_BATCH", DEFAULT_MAX_BATCH),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.buffer_size == 0 {
            return Err("usage buffer_size must be > 0".to_string());
        }
        if self.flush_interval_ms == 0 {
            return Err("usage flush_interval_ms must be > 0".to_string());
        }
        if self.max_batch == 0 {
            return Err("usage max_batch must be > 0".to_string());
        }
        Ok(())
    }
}

/// Counters describing how the call log is keeping up
#[derive(Debug, Default)]
pub struct RecorderStats {
    queued: AtomicU64,
    dropped: AtomicU64,
    written: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`RecorderStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderStatsSnapshot {
    /// Records accepted onto the channel
    pub queued: u64,
    /// Records rejected because the channel was full or closed
    pub dropped: u64,
    /// Records appended to storage
    pub written: u64,
    /// Records lost because the append failed
    pub failed: u64,
}

impl RecorderStats {
    pub fn snapshot(&self) -> RecorderStatsSnapshot {
        RecorderStatsSnapshot {
            queued: self.queued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }
}

/// Handle for logging TMDB calls
///
/// Cheap to clone. Records are stamped with the service clock and sent to
/// [`usage_writer_task`] for batched database writes.
#[derive(Clone)]
pub struct CallLogRecorder {
    sender: mpsc::Sender<UsageRecord>,
    clock: ServiceClock,
    stats: Arc<RecorderStats>,
}

impl CallLogRecorder {
    /// Create a new recorder
    ///
    /// Returns the handle and the receiver for the background writer.
    pub fn new(config: &RecorderConfig, clock: ServiceClock) -> (Self, mpsc::Receiver<UsageRecord>) {
        let (sender, receiver) = mpsc::channel(config.buffer_size.max(1));
        let recorder = Self {
            sender,
            clock,
            stats: Arc::new(RecorderStats::default()),
        };
        (recorder, receiver)
    }

    /// Shared counters, also updated by the writer task
    pub fn stats(&self) -> Arc<RecorderStats> {
        self.stats.clone()
    }

    /// Log one call (non-blocking)
    ///
    /// If the buffer is full or the writer is gone the record is dropped
    /// and written to tracing instead.
    pub fn log_call(&self, kind: CallKind, subject_id: i64, endpoint_path: &str) {
        let record = UsageRecord::new(kind, subject_id, endpoint_path, self.clock.now());

        match self.sender.try_send(record) {
            Ok(()) => {
                RecorderStats::add(&self.stats.queued, 1);
                debug!(
                    kind = kind.as_str(),
                    subject_id,
                    endpoint = endpoint_path,
                    "Usage record queued"
                );
            }
            Err(mpsc::error::TrySendError::Full(record)) => {
                RecorderStats::add(&self.stats.dropped, 1);
                #[cfg(feature = "metrics")]
                crate::metrics::record_usage_log_loss("buffer_full", 1);
                warn!(kind = kind.as_str(), "Usage buffer full, record dropped");
                log_records_as_fallback(std::slice::from_ref(&record), "buffer overflow");
            }
            Err(mpsc::error::TrySendError::Closed(record)) => {
                RecorderStats::add(&self.stats.dropped, 1);
                #[cfg(feature = "metrics")]
                crate::metrics::record_usage_log_loss("channel_closed", 1);
                error!(kind = kind.as_str(), "Usage channel closed, record dropped");
                log_records_as_fallback(std::slice::from_ref(&record), "channel closed");
            }
        }
    }
}

impl UsageSink for CallLogRecorder {
    fn record(&self, kind: CallKind, subject_id: i64, endpoint_path: &str) {
        self.log_call(kind, subject_id, endpoint_path);
    }
}

/// Create a recorder and spawn its writer on the current runtime
///
/// The writer exits after the last recorder handle is dropped and the
/// remaining records are flushed.
pub fn spawn_recorder(
    config: RecorderConfig,
    clock: ServiceClock,
    store: Arc<DynUsageStore>,
) -> (CallLogRecorder, JoinHandle<()>) {
    let (recorder, receiver) = CallLogRecorder::new(&config, clock);
    let stats = recorder.stats();
    let handle = tokio::spawn(usage_writer_task(receiver, store, config, stats));
    (recorder, handle)
}

/// Background task that writes usage records to the database
///
/// This task:
/// 1. Batches records from the channel
/// 2. Appends them in one transaction per batch
/// 3. On failure logs the batch to tracing and moves on
pub async fn usage_writer_task(
    mut receiver: mpsc::Receiver<UsageRecord>,
    store: Arc<DynUsageStore>,
    config: RecorderConfig,
    stats: Arc<RecorderStats>,
) {
    let flush_interval = Duration::from_millis(config.flush_interval_ms.max(1));
    let max_batch = config.max_batch.max(1);
    let mut batch: Vec<UsageRecord> = Vec::with_capacity(max_batch);
    let mut interval = tokio::time::interval(flush_interval);

    info!(
        buffer_size = config.buffer_size,
        flush_interval_ms = config.flush_interval_ms,
        max_batch,
        "Usage writer task started"
    );

    loop {
        tokio::select! {
            record = receiver.recv() => {
                match record {
                    Some(r) => {
                        batch.push(r);
                        if batch.len() >= max_batch {
                            flush_batch(&mut batch, &store, &stats).await;
                        }
                    }
                    None => {
                        // Channel closed, flush remaining and exit
                        flush_batch(&mut batch, &store, &stats).await;
                        info!("Usage writer task shutting down");
                        break;
                    }
                }
            }
            _ = interval.tick() => {
                flush_batch(&mut batch, &store, &stats).await;
            }
        }
    }
}

/// Flush a batch of usage records to the store
async fn flush_batch(
    batch: &mut Vec<UsageRecord>,
    store: &Arc<DynUsageStore>,
    stats: &RecorderStats,
) {
    if batch.is_empty() {
        return;
    }

    let records: Vec<UsageRecord> = std::mem::take(batch);
    let count = records.len();

    debug!(count, "Flushing usage batch");

    let store = store.clone();
    // Return records on error so we can log them as fallback
    let result = tokio::task::spawn_blocking(move || match store.append_batch(&records) {
        Ok(written) => Ok(written),
        Err(e) => Err((e, records)),
    })
    .await;

    match result {
        Ok(Ok(written)) => {
            RecorderStats::add(&stats.written, written);
            debug!(written, "Usage batch written to database");
        }
        Ok(Err((e, records))) => {
            RecorderStats::add(&stats.failed, count);
            #[cfg(feature = "metrics")]
            crate::metrics::record_usage_log_loss("write_failed", count);
            error!(error = %e, count, "Failed to write usage batch to database");
            log_records_as_fallback(&records, "DB write failure");
        }
        Err(e) => {
            RecorderStats::add(&stats.failed, count);
            #[cfg(feature = "metrics")]
            crate::metrics::record_usage_log_loss("write_failed", count);
            error!(error = %e, count, "Usage write task panicked");
        }
    }
}

/// Log usage records to tracing when they cannot be stored
fn log_records_as_fallback(records: &[UsageRecord], reason: &str) {
    for record in records {
        warn!(
            target: "usage_fallback",
            kind = record.kind.as_str(),
            subject_id = record.subject_id,
            endpoint = %record.endpoint_path,
            recorded_at = %record.recorded_at,
            reason = reason,
            "Usage record (fallback)"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone, Utc};
    use reviewdesk_usage_core::{Result, SubjectPopularity, UsageError};
    use reviewdesk_usage_storage::{
        CountFilter, LocalSqliteBackend, SqliteUsageStore, UsageStore,
    };
    use tempfile::NamedTempFile;

    /// Store whose writes always fail
    struct FailingStore;

    impl UsageStore for FailingStore {
        fn append(&self, _record: &UsageRecord) -> Result<()> {
            Err(UsageError::Other("storage unavailable".to_string()))
        }

        fn append_batch(&self, _records: &[UsageRecord]) -> Result<usize> {
            Err(UsageError::Other("storage unavailable".to_string()))
        }

        fn count(&self, _filter: &CountFilter) -> Result<u64> {
            Ok(0)
        }

        fn top_subjects(&self, _kind: CallKind, _limit: usize) -> Result<Vec<SubjectPopularity>> {
            Ok(Vec::new())
        }

        fn recent(&self, _limit: usize) -> Result<Vec<UsageRecord>> {
            Ok(Vec::new())
        }
    }

    fn pinned_clock() -> ServiceClock {
        let at = Utc.with_ymd_and_hms(2026, 6, 1, 9, 30, 0).unwrap();
        ServiceClock::fixed(FixedOffset::east_opt(0).unwrap(), at)
    }

    #[test]
    fn test_recorder_config_defaults() {
        let config = RecorderConfig::default();
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(config.flush_interval_ms, DEFAULT_FLUSH_INTERVAL_MS);
        assert_eq!(config.max_batch, DEFAULT_MAX_BATCH);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_recorder_config_validate() {
        let config = RecorderConfig {
            buffer_size: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("buffer_size"));
    }

    #[tokio::test]
    async fn test_log_call_stamps_and_queues() {
        let (recorder, mut receiver) = CallLogRecorder::new(&RecorderConfig::default(), pinned_clock());

        recorder.log_call(CallKind::Detail, 42, "/movie/42");

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.kind, CallKind::Detail);
        assert_eq!(received.subject_id, 42);
        assert_eq!(received.endpoint_path, "/movie/42");
        assert_eq!(received.recorded_at, pinned_clock().now());
        assert_eq!(recorder.stats().snapshot().queued, 1);
    }

    #[tokio::test]
    async fn test_full_buffer_drops_without_blocking() {
        let config = RecorderConfig {
            buffer_size: 1,
            ..Default::default()
        };
        let (recorder, _receiver) = CallLogRecorder::new(&config, pinned_clock());

        recorder.log_call(CallKind::Search, 0, "/search/movie");
        recorder.log_call(CallKind::Search, 0, "/search/movie");
        recorder.log_call(CallKind::Search, 0, "/search/movie");

        let stats = recorder.stats().snapshot();
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.dropped, 2);
    }

    #[tokio::test]
    async fn test_closed_channel_is_not_an_error() {
        let (recorder, receiver) = CallLogRecorder::new(&RecorderConfig::default(), pinned_clock());
        drop(receiver);

        // Through the trait, as catalog calls use it
        let sink: &dyn UsageSink = &recorder;
        sink.record(CallKind::ListPopular, 0, "/movie/popular");

        assert_eq!(recorder.stats().snapshot().dropped, 1);
    }

    #[tokio::test]
    async fn test_writer_flushes_on_shutdown() {
        let temp_file = NamedTempFile::new().unwrap();
        let store: Arc<DynUsageStore> =
            Arc::new(SqliteUsageStore::new(LocalSqliteBackend::new(temp_file.path())));

        let (recorder, handle) =
            spawn_recorder(RecorderConfig::default(), pinned_clock(), store.clone());
        let stats = recorder.stats();

        recorder.log_call(CallKind::Search, 0, "/search/movie");
        recorder.log_call(CallKind::Detail, 42, "/movie/42");
        recorder.log_call(CallKind::StatusProbe, 0, "/authentication/token/new");
        drop(recorder);

        handle.await.unwrap();

        assert_eq!(store.count(&CountFilter::default()).unwrap(), 3);
        assert_eq!(store.count(&CountFilter::real_usage()).unwrap(), 2);
        assert_eq!(stats.snapshot().written, 3);
        assert_eq!(stats.snapshot().failed, 0);
    }

    #[tokio::test]
    async fn test_writer_flushes_full_batches() {
        let temp_file = NamedTempFile::new().unwrap();
        let store: Arc<DynUsageStore> =
            Arc::new(SqliteUsageStore::new(LocalSqliteBackend::new(temp_file.path())));
        let config = RecorderConfig {
            max_batch: 2,
            flush_interval_ms: 60_000,
            ..Default::default()
        };

        let (recorder, handle) = spawn_recorder(config, pinned_clock(), store.clone());
        for _ in 0..5 {
            recorder.log_call(CallKind::ListPopular, 0, "/movie/popular");
        }
        drop(recorder);
        handle.await.unwrap();

        assert_eq!(store.count(&CountFilter::default()).unwrap(), 5);
    }

    #[tokio::test]
    async fn test_writer_survives_failing_store() {
        let store: Arc<DynUsageStore> = Arc::new(FailingStore);
        let (recorder, handle) = spawn_recorder(RecorderConfig::default(), pinned_clock(), store);
        let stats = recorder.stats();

        recorder.log_call(CallKind::Detail, 1, "/movie/1");
        recorder.log_call(CallKind::Detail, 2, "/movie/2");
        drop(recorder);

        // Writer finishes normally even though every append failed
        handle.await.unwrap();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.queued, 2);
        assert_eq!(snapshot.written, 0);
        assert_eq!(snapshot.failed, 2);
    }
}
