//! Usage statistics for the TMDB settings page
//!
//! Response shape consumed by the admin console:
//!
//! ```json
//! {
//!   "totalCalls": 120,
//!   "todayCalls": 8,
//!   "dailyCalls": [{"date": "06.09", "isoDate": "2026-06-09", "calls": 5}],
//!   "popularMovies": [{"id": 42, "title": "괴물", "originalTitle": "The Host", "calls": 3}]
//! }
//! ```

use chrono::NaiveDate;
use reviewdesk_usage_core::DailyUsageBucket;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregator::UsageAggregator;
use crate::error::AdminError;
use crate::ranking::{PopularityRanker, RankedSubject};

/// One point of the daily usage chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCalls {
    /// Short `MM.dd` axis label
    pub date: String,
    pub iso_date: NaiveDate,
    pub calls: u64,
}

impl From<DailyUsageBucket> for DailyCalls {
    fn from(bucket: DailyUsageBucket) -> Self {
        Self {
            date: bucket.date.format("%m.%d").to_string(),
            iso_date: bucket.date,
            calls: bucket.count,
        }
    }
}

/// One entry of the most-viewed movie list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularMovie {
    pub id: i64,
    pub title: String,
    pub original_title: String,
    pub calls: u64,
}

impl From<RankedSubject> for PopularMovie {
    fn from(subject: RankedSubject) -> Self {
        Self {
            id: subject.subject_id,
            title: subject.title,
            original_title: subject.alternate_title,
            calls: subject.call_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStatsResponse {
    pub total_calls: u64,
    pub today_calls: u64,
    pub daily_calls: Vec<DailyCalls>,
    pub popular_movies: Vec<PopularMovie>,
}

/// Gather all usage statistics
///
/// Today is counted before the total; with an append-only log that keeps
/// `today_calls <= total_calls` even while calls are being recorded.
pub async fn collect_usage_stats(
    aggregator: &UsageAggregator,
    ranker: &PopularityRanker,
    window_days: u32,
    top_n: usize,
) -> Result<UsageStatsResponse, AdminError> {
    let today_calls = aggregator.count_today().await?;
    let total_calls = aggregator.count_all_time().await?;

    let (daily, popular) = tokio::try_join!(
        aggregator.daily_series(window_days),
        ranker.top_subjects(top_n)
    )?;

    debug!(
        total_calls,
        today_calls,
        window_days,
        ranked = popular.len(),
        "Collected TMDB usage stats"
    );

    Ok(UsageStatsResponse {
        total_calls,
        today_calls,
        daily_calls: daily.into_iter().map(DailyCalls::from).collect(),
        popular_movies: popular.into_iter().map(PopularMovie::from).collect(),
    })
}
