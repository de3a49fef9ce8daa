//! Usage aggregation over the call log
//!
//! All counts exclude `status_probe` records. Day boundaries come from the
//! [`ServiceClock`], so "today" and the daily buckets agree on where a day
//! starts.

use futures::future::try_join_all;
use reviewdesk_usage_core::{validation, DailyUsageBucket, ServiceClock};
use reviewdesk_usage_storage::{CountFilter, DynUsageStore};
use std::sync::Arc;
use tracing::debug;

use crate::error::AdminError;

/// Read-side queries over recorded usage
#[derive(Clone)]
pub struct UsageAggregator {
    store: Arc<DynUsageStore>,
    clock: ServiceClock,
}

impl UsageAggregator {
    pub fn new(store: Arc<DynUsageStore>, clock: ServiceClock) -> Self {
        Self { store, clock }
    }

    pub fn clock(&self) -> &ServiceClock {
        &self.clock
    }

    /// Real-usage calls since the start of today
    pub async fn count_today(&self) -> Result<u64, AdminError> {
        let start = self.clock.start_of_day(self.clock.today());
        self.count(CountFilter::real_usage().since(start)).await
    }

    /// Real-usage calls ever recorded
    pub async fn count_all_time(&self) -> Result<u64, AdminError> {
        self.count(CountFilter::real_usage()).await
    }

    /// One bucket per day for the last `window_days` days, oldest first
    ///
    /// Every day in the window is present, including days without calls.
    /// Buckets are half-open and adjacent, so each record lands in exactly
    /// one of them.
    pub async fn daily_series(&self, window_days: u32) -> Result<Vec<DailyUsageBucket>, AdminError> {
        validation::validate_window_days(window_days)?;

        let days = self.clock.trailing_days(window_days);
        let counts = try_join_all(days.iter().map(|&date| {
            let (start, end) = self.clock.day_range(date);
            self.count(CountFilter::real_usage().between(start, end))
        }))
        .await?;

        debug!(window_days, "Computed daily usage series");

        // try_join_all keeps input order
        Ok(days
            .into_iter()
            .zip(counts)
            .map(|(date, count)| DailyUsageBucket { date, count })
            .collect())
    }

    async fn count(&self, filter: CountFilter) -> Result<u64, AdminError> {
        let store = self.store.clone();
        let count = tokio::task::spawn_blocking(move || store.count(&filter)).await??;
        Ok(count)
    }
}
