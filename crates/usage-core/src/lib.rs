//! ReviewDesk Usage Core
//!
//! Core types, traits, and SQLite schema for TMDB usage accounting.
//!
//! Every outbound catalog call worth counting becomes one append-only
//! [`UsageRecord`] in the `tmdb_api_log` table. Aggregated views
//! ([`DailyUsageBucket`], [`SubjectPopularity`]) are derived on demand and
//! never stored.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod clock;
pub mod validation;

pub use clock::ServiceClock;

/// Subject id used for calls that do not target a single catalog entry
pub const NO_SUBJECT: i64 = 0;

/// Current schema version stored in `schema_meta`
pub const SCHEMA_VERSION: i64 = 1;

/// Classification of an outbound catalog call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    /// Free-text movie search
    Search,
    /// Popular movie listing
    ListPopular,
    /// Per-movie detail lookup
    Detail,
    /// Connectivity check, not user-initiated usage
    StatusProbe,
}

impl CallKind {
    pub const ALL: [CallKind; 4] = [
        CallKind::Search,
        CallKind::ListPopular,
        CallKind::Detail,
        CallKind::StatusProbe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::Search => "search",
            CallKind::ListPopular => "list_popular",
            CallKind::Detail => "detail",
            CallKind::StatusProbe => "status_probe",
        }
    }

    /// Whether calls of this kind count towards real usage totals
    pub fn is_real_usage(&self) -> bool {
        !matches!(self, CallKind::StatusProbe)
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallKind {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self> {
        CallKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UsageError::InvalidKind(s.to_string()))
    }
}

/// One logged occurrence of an outbound catalog call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// What kind of call was made
    pub kind: CallKind,
    /// Catalog id of the subject, or [`NO_SUBJECT`]
    pub subject_id: i64,
    /// Logical endpoint path, kept for diagnostics
    pub endpoint_path: String,
    /// When the call was recorded
    pub recorded_at: DateTime<Utc>,
}

impl UsageRecord {
    pub fn new(
        kind: CallKind,
        subject_id: i64,
        endpoint_path: impl Into<String>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            subject_id,
            endpoint_path: endpoint_path.into(),
            recorded_at,
        }
    }
}

/// Number of real-usage calls that fell on one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsageBucket {
    pub date: NaiveDate,
    pub count: u64,
}

/// Call count for a single catalog subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectPopularity {
    pub subject_id: i64,
    pub call_count: u64,
}

/// Destination for usage records produced by catalog calls
///
/// Implementations must not block and must not fail: the signature has no
/// error path so that accounting can never break the call it accompanies.
pub trait UsageSink: Send + Sync {
    fn record(&self, kind: CallKind, subject_id: i64, endpoint_path: &str);
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl UsageSink for NoopSink {
    fn record(&self, _kind: CallKind, _subject_id: i64, _endpoint_path: &str) {}
}

/// Errors that can occur in usage operations
#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unknown call kind: {0}")]
    InvalidKind(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// Result type for usage operations
pub type Result<T> = std::result::Result<T, UsageError>;

/// Initialize the SQLite schema for usage accounting
///
/// Creates the tables if they don't exist:
/// - `schema_meta`: schema version
/// - `tmdb_api_log`: append-only call log, `recorded_at` in unix milliseconds (UTC)
pub fn init_sqlite_schema(conn: &rusqlite::Connection) -> Result<()> {
    let ddl = r#"
    CREATE TABLE IF NOT EXISTS schema_meta (
      key TEXT PRIMARY KEY,
      value TEXT NOT NULL
    );

    -- Append-only log of outbound TMDB calls
    CREATE TABLE IF NOT EXISTS tmdb_api_log (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      kind TEXT NOT NULL,
      subject_id INTEGER NOT NULL DEFAULT 0,
      endpoint TEXT NOT NULL,
      recorded_at INTEGER NOT NULL,
      CHECK (kind IN ('search', 'list_popular', 'detail', 'status_probe'))
    );

    CREATE INDEX IF NOT EXISTS idx_tmdb_api_log_recorded_at ON tmdb_api_log(recorded_at);
    CREATE INDEX IF NOT EXISTS idx_tmdb_api_log_kind_subject ON tmdb_api_log(kind, subject_id);
    "#;

    conn.execute_batch(ddl)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}

/// Read the schema version recorded in `schema_meta`
pub fn get_schema_version(conn: &rusqlite::Connection) -> Result<i64> {
    let version: String = conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'version'",
        [],
        |row| row.get(0),
    )?;

    version
        .parse()
        .map_err(|e| UsageError::Other(format!("Invalid version format: {}", e)))
}
