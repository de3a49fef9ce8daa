//! ReviewDesk Usage Storage
//!
//! Storage backend abstraction for TMDB usage records.
//!
//! Two layers:
//! - [`UsageBackend`] hands out SQLite connections (local file today)
//! - [`UsageStore`] is the persistence interface the recorder and the
//!   aggregators talk to: append, range count, grouped subject count

use chrono::{DateTime, TimeZone, Utc};
use reviewdesk_usage_core::{
    init_sqlite_schema, CallKind, Result, SubjectPopularity, UsageError, UsageRecord,
};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub mod config;

pub use config::StorageConfig;

/// Backend abstraction for usage storage
///
/// Implementations decide where the SQLite database lives. Every call to
/// [`UsageBackend::get_connection`] returns a fresh connection with the
/// schema in place.
pub trait UsageBackend: Send + Sync {
    /// Get a connection to the usage database
    fn get_connection(&self) -> Result<Connection>;

    /// Check if the database exists
    fn exists(&self) -> Result<bool>;

    /// Initialize a new database (create the file and schema)
    fn initialize(&self) -> Result<()>;
}

/// Local filesystem SQLite backend
#[derive(Clone, Debug)]
pub struct LocalSqliteBackend {
    /// Path to the SQLite database file
    path: PathBuf,
    /// How long a connection waits on a locked database
    busy_timeout: Duration,
}

impl LocalSqliteBackend {
    /// Create a new local SQLite backend
    ///
    /// # Example
    /// ```
    /// use reviewdesk_usage_storage::LocalSqliteBackend;
    ///
    /// let backend = LocalSqliteBackend::new("usage.db");
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            busy_timeout: Duration::from_millis(config::DEFAULT_BUSY_TIMEOUT_MS),
        }
    }

    /// Create a backend from storage configuration
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.db_path).with_busy_timeout(config.busy_timeout)
    }

    /// Set the busy timeout applied to every connection
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Get the path to the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        // Readers and the background writer run on separate connections
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        Ok(conn)
    }
}

impl UsageBackend for LocalSqliteBackend {
    fn get_connection(&self) -> Result<Connection> {
        let conn = self.open()?;
        init_sqlite_schema(&conn)?;
        Ok(conn)
    }

    fn exists(&self) -> Result<bool> {
        Ok(self.path.exists())
    }

    fn initialize(&self) -> Result<()> {
        if self.exists()? {
            return Err(UsageError::Other(format!(
                "Usage database already exists at {:?}",
                self.path
            )));
        }

        let conn = self.open()?;
        init_sqlite_schema(&conn)?;
        tracing::debug!(path = ?self.path, "Usage database initialized");

        Ok(())
    }
}

/// Filter for counting usage records
///
/// `from` is inclusive and `until` exclusive, so consecutive filters built
/// from adjacent day boundaries never double count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountFilter {
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub exclude_kind: Option<CallKind>,
}

impl CountFilter {
    /// Every record except connectivity probes
    pub fn real_usage() -> Self {
        Self {
            exclude_kind: Some(CallKind::StatusProbe),
            ..Default::default()
        }
    }

    pub fn since(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.until = Some(until);
        self
    }
}

/// Persistence interface for usage records
///
/// The log is append-only: there is no update or delete.
pub trait UsageStore: Send + Sync {
    /// Append a single record
    fn append(&self, record: &UsageRecord) -> Result<()>;

    /// Append records in one transaction, returning how many were written
    fn append_batch(&self, records: &[UsageRecord]) -> Result<usize>;

    /// Count records matching `filter`
    fn count(&self, filter: &CountFilter) -> Result<u64>;

    /// Most-called subjects of `kind`, highest count first
    ///
    /// Ties keep the order in which subjects were first recorded.
    fn top_subjects(&self, kind: CallKind, limit: usize) -> Result<Vec<SubjectPopularity>>;

    /// Latest records, newest first
    fn recent(&self, limit: usize) -> Result<Vec<UsageRecord>>;
}

/// Trait object form used by the API layer
pub type DynUsageStore = dyn UsageStore;

impl<T: UsageStore + ?Sized> UsageStore for Arc<T> {
    fn append(&self, record: &UsageRecord) -> Result<()> {
        (**self).append(record)
    }

    fn append_batch(&self, records: &[UsageRecord]) -> Result<usize> {
        (**self).append_batch(records)
    }

    fn count(&self, filter: &CountFilter) -> Result<u64> {
        (**self).count(filter)
    }

    fn top_subjects(&self, kind: CallKind, limit: usize) -> Result<Vec<SubjectPopularity>> {
        (**self).top_subjects(kind, limit)
    }

    fn recent(&self, limit: usize) -> Result<Vec<UsageRecord>> {
        (**self).recent(limit)
    }
}

/// [`UsageStore`] backed by the `tmdb_api_log` table
#[derive(Clone, Debug)]
pub struct SqliteUsageStore<B: UsageBackend> {
    backend: B,
}

impl<B: UsageBackend> SqliteUsageStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: UsageBackend> UsageStore for SqliteUsageStore<B> {
    fn append(&self, record: &UsageRecord) -> Result<()> {
        let conn = self.backend.get_connection()?;
        insert_record(&conn, record)?;
        Ok(())
    }

    fn append_batch(&self, records: &[UsageRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut conn = self.backend.get_connection()?;
        let tx = conn.transaction()?;
        for record in records {
            insert_record(&tx, record)?;
        }
        tx.commit()?;

        Ok(records.len())
    }

    fn count(&self, filter: &CountFilter) -> Result<u64> {
        let conn = self.backend.get_connection()?;
        count_records(&conn, filter)
    }

    fn top_subjects(&self, kind: CallKind, limit: usize) -> Result<Vec<SubjectPopularity>> {
        let conn = self.backend.get_connection()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT subject_id, COUNT(*) AS calls, MIN(id) AS first_seen
            FROM tmdb_api_log
            WHERE kind = ?1
            GROUP BY subject_id
            ORDER BY calls DESC, first_seen ASC
            LIMIT ?2
            "#,
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let subjects = stmt
            .query_map(rusqlite::params![kind.as_str(), limit], |row| {
                Ok(SubjectPopularity {
                    subject_id: row.get(0)?,
                    call_count: row.get::<_, i64>(1)?.max(0) as u64,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(subjects)
    }

    fn recent(&self, limit: usize) -> Result<Vec<UsageRecord>> {
        let conn = self.backend.get_connection()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT kind, subject_id, endpoint, recorded_at
            FROM tmdb_api_log
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map([limit], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(kind, subject_id, endpoint, recorded_at)| {
                Ok(UsageRecord::new(
                    kind.parse()?,
                    subject_id,
                    endpoint,
                    from_millis(recorded_at)?,
                ))
            })
            .collect()
    }
}

fn insert_record(conn: &Connection, record: &UsageRecord) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        r#"
        INSERT INTO tmdb_api_log (kind, subject_id, endpoint, recorded_at)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )?;
    stmt.execute(rusqlite::params![
        record.kind.as_str(),
        record.subject_id,
        record.endpoint_path,
        record.recorded_at.timestamp_millis(),
    ])?;
    Ok(())
}

fn count_records(conn: &Connection, filter: &CountFilter) -> Result<u64> {
    // Build WHERE clause dynamically
    let mut conditions: Vec<&str> = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(from) = filter.from {
        conditions.push("recorded_at >= ?");
        values.push(Box::new(from.timestamp_millis()));
    }
    if let Some(until) = filter.until {
        conditions.push("recorded_at < ?");
        values.push(Box::new(until.timestamp_millis()));
    }
    if let Some(kind) = filter.exclude_kind {
        conditions.push("kind <> ?");
        values.push(Box::new(kind.as_str()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let sql = format!("SELECT COUNT(*) FROM tmdb_api_log {}", where_clause);
    let mut stmt = conn.prepare(&sql)?;
    let params_ref: Vec<&dyn rusqlite::ToSql> = values.iter().map(|b| b.as_ref()).collect();
    let count: i64 = stmt.query_row(params_ref.as_slice(), |row| row.get(0))?;

    Ok(count.max(0) as u64)
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| UsageError::Other(format!("Invalid recorded_at value: {}", millis)))
}
