//! TMDB connectivity status
//!
//! [`StatusMonitor`] runs a live probe, times it, and keeps the most recent
//! failures in a bounded [`ErrorBuffer`]. The buffer lives as long as the
//! monitor and is not persisted, so it resets on restart.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reviewdesk_tmdb_client::ConnectivityProbe;
use reviewdesk_usage_core::ServiceClock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// One failed status check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusError {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Rolling buffer of recent failures, oldest evicted first
#[derive(Debug)]
pub struct ErrorBuffer {
    entries: VecDeque<StatusError>,
    capacity: usize,
}

impl ErrorBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, error: StatusError) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(error);
    }

    /// Entries newest first
    pub fn snapshot(&self) -> Vec<StatusError> {
        self.entries.iter().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Outcome of a single status check
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub connected: bool,
    pub response_time_ms: u64,
    pub checked_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Probes TMDB and remembers recent failures
pub struct StatusMonitor {
    probe: Arc<dyn ConnectivityProbe>,
    errors: Mutex<ErrorBuffer>,
    clock: ServiceClock,
}

impl StatusMonitor {
    pub fn new(probe: Arc<dyn ConnectivityProbe>, error_capacity: usize, clock: ServiceClock) -> Self {
        Self {
            probe,
            errors: Mutex::new(ErrorBuffer::new(error_capacity)),
            clock,
        }
    }

    /// Run one probe; failures become `connected = false`, never an error
    pub async fn check_status(&self) -> StatusReport {
        let started = Instant::now();
        let result = self.probe.probe().await;
        let elapsed = started.elapsed();
        let response_time_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let checked_at = self.clock.now();

        #[cfg(feature = "metrics")]
        crate::metrics::record_status_check(result.is_ok(), elapsed.as_secs_f64());

        match result {
            Ok(()) => {
                info!(response_time_ms, "TMDB status check succeeded");
                StatusReport {
                    connected: true,
                    response_time_ms,
                    checked_at,
                    error: None,
                }
            }
            Err(e) => {
                let message = e.to_string();
                warn!(response_time_ms, error = %message, "TMDB status check failed");
                self.errors.lock().push(StatusError {
                    timestamp: checked_at,
                    message: message.clone(),
                });
                StatusReport {
                    connected: false,
                    response_time_ms,
                    checked_at,
                    error: Some(message),
                }
            }
        }
    }

    /// Recent failures, newest first
    pub fn recent_errors(&self) -> Vec<StatusError> {
        self.errors.lock().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use reviewdesk_tmdb_client::TmdbError;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct SwitchProbe {
        up: AtomicBool,
    }

    #[async_trait]
    impl ConnectivityProbe for SwitchProbe {
        async fn probe(&self) -> reviewdesk_tmdb_client::Result<()> {
            if self.up.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(TmdbError::UpstreamUnavailable {
                    endpoint: "/authentication/token/new".to_string(),
                    status: Some(401),
                    reason: "HTTP 401 Unauthorized".to_string(),
                })
            }
        }
    }

    fn error_at(second: u32) -> StatusError {
        StatusError {
            timestamp: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, second).unwrap(),
            message: format!("failure {}", second),
        }
    }

    #[test]
    fn test_error_buffer_evicts_oldest() {
        let mut buffer = ErrorBuffer::new(3);
        for second in 0..5 {
            buffer.push(error_at(second));
        }

        assert_eq!(buffer.len(), 3);
        let messages: Vec<_> = buffer.snapshot().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["failure 4", "failure 3", "failure 2"]);
    }

    #[test]
    fn test_error_buffer_zero_capacity_holds_one() {
        let mut buffer = ErrorBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        buffer.push(error_at(1));
        buffer.push(error_at(2));
        assert_eq!(buffer.snapshot(), vec![error_at(2)]);
    }

    #[tokio::test]
    async fn test_check_status_records_failures_only() {
        let probe = Arc::new(SwitchProbe {
            up: AtomicBool::new(true),
        });
        let monitor = StatusMonitor::new(probe.clone(), 10, ServiceClock::utc());

        let report = monitor.check_status().await;
        assert!(report.connected);
        assert!(report.error.is_none());
        assert!(monitor.recent_errors().is_empty());

        probe.up.store(false, Ordering::SeqCst);
        let report = monitor.check_status().await;
        assert!(!report.connected);
        assert!(report.error.as_deref().unwrap().contains("token/new"));

        let errors = monitor.recent_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].timestamp, report.checked_at);
    }

    #[tokio::test]
    async fn test_status_report_json_shape() {
        let probe = Arc::new(SwitchProbe {
            up: AtomicBool::new(true),
        });
        let monitor = StatusMonitor::new(probe, 10, ServiceClock::utc());

        let value = serde_json::to_value(monitor.check_status().await).unwrap();
        assert_eq!(value["connected"], true);
        assert!(value["responseTimeMs"].is_u64());
        assert!(value["checkedAt"].is_string());
        assert!(value.get("error").is_none());
    }
}
