//! Most-viewed movie ranking
//!
//! Counts come from `detail` records; titles come from the catalog. A
//! failed title lookup only degrades that entry's label.

use futures::future::join_all;
use reviewdesk_tmdb_client::{SubjectMetadata, SubjectResolver};
use reviewdesk_usage_core::{validation, CallKind, SubjectPopularity};
use reviewdesk_usage_storage::DynUsageStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::error::AdminError;

/// A ranked subject with display metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedSubject {
    pub subject_id: i64,
    pub title: String,
    pub alternate_title: String,
    pub call_count: u64,
}

impl RankedSubject {
    fn resolved(popularity: SubjectPopularity, metadata: SubjectMetadata) -> Self {
        Self {
            subject_id: popularity.subject_id,
            title: metadata.title,
            alternate_title: metadata.alternate_title,
            call_count: popularity.call_count,
        }
    }

    fn fallback(popularity: SubjectPopularity) -> Self {
        Self {
            subject_id: popularity.subject_id,
            title: fallback_title(popularity.subject_id),
            alternate_title: String::new(),
            call_count: popularity.call_count,
        }
    }
}

/// Placeholder label for a subject whose metadata could not be fetched
pub fn fallback_title(subject_id: i64) -> String {
    format!("영화 {}", subject_id)
}

/// Ranks subjects by detail-call count
#[derive(Clone)]
pub struct PopularityRanker {
    store: Arc<DynUsageStore>,
    resolver: Arc<dyn SubjectResolver>,
}

impl PopularityRanker {
    pub fn new(store: Arc<DynUsageStore>, resolver: Arc<dyn SubjectResolver>) -> Self {
        Self { store, resolver }
    }

    /// Top `n` subjects, highest count first
    ///
    /// Metadata is resolved concurrently; the output keeps rank order.
    pub async fn top_subjects(&self, n: usize) -> Result<Vec<RankedSubject>, AdminError> {
        validation::validate_top_n(n)?;

        let store = self.store.clone();
        let ranked =
            tokio::task::spawn_blocking(move || store.top_subjects(CallKind::Detail, n)).await??;

        let resolved = join_all(ranked.into_iter().map(|popularity| async move {
            match self.resolver.resolve_subject(popularity.subject_id).await {
                Ok(metadata) => RankedSubject::resolved(popularity, metadata),
                Err(e) => {
                    warn!(
                        subject_id = popularity.subject_id,
                        error = %e,
                        "Movie metadata lookup failed, using fallback title"
                    );
                    RankedSubject::fallback(popularity)
                }
            }
        }))
        .await;

        Ok(resolved)
    }
}
