//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools. All upserts are single-document writes; the
//! scope lock in `dmbridge-core` serializes the only multi-writer hot path
//! (ingest), so read-then-write merges here are race-free in practice.

pub mod message;
pub mod pool;
pub mod session;
pub mod sync_run;
pub mod thread;
pub mod user;

use chrono::{DateTime, Utc};
use dmbridge_types::error::RepositoryError;

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

pub(crate) fn query_err(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::pool::DatabasePool;

    /// Fresh migrated database on a temp path.
    pub(crate) async fn temp_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        // Leak the tempdir so the file outlives the test body.
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }
}
