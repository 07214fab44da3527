//! SQLite sync-run repository.

use dmbridge_core::repository::SyncRunRepository;
use dmbridge_types::error::RepositoryError;
use dmbridge_types::sync::{SyncErrorEntry, SyncMode, SyncRun, SyncRunStatus, SyncScope};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_err};

/// SQLite-backed implementation of `SyncRunRepository`.
#[derive(Clone)]
pub struct SqliteSyncRunRepository {
    pool: DatabasePool,
}

impl SqliteSyncRunRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct SyncRunRow {
    id: String,
    scope: String,
    mode: String,
    status: String,
    started_at: String,
    finished_at: Option<String>,
    items_processed: i64,
    items_created: i64,
    items_updated: i64,
    cursor_ts: Option<String>,
    errors: String,
}

impl SyncRunRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            scope: row.try_get("scope")?,
            mode: row.try_get("mode")?,
            status: row.try_get("status")?,
            started_at: row.try_get("started_at")?,
            finished_at: row.try_get("finished_at")?,
            items_processed: row.try_get("items_processed")?,
            items_created: row.try_get("items_created")?,
            items_updated: row.try_get("items_updated")?,
            cursor_ts: row.try_get("cursor_ts")?,
            errors: row.try_get("errors")?,
        })
    }

    fn into_run(self) -> Result<SyncRun, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid run id: {e}")))?;
        let scope: SyncScope = self.scope.parse().map_err(RepositoryError::Query)?;
        let mode: SyncMode = self.mode.parse().map_err(RepositoryError::Query)?;
        let status: SyncRunStatus = self.status.parse().map_err(RepositoryError::Query)?;
        let errors: Vec<SyncErrorEntry> = serde_json::from_str(&self.errors)
            .map_err(|e| RepositoryError::Query(format!("invalid errors json: {e}")))?;

        Ok(SyncRun {
            id,
            scope,
            mode,
            status,
            started_at: parse_datetime(&self.started_at)?,
            finished_at: self.finished_at.as_deref().map(parse_datetime).transpose()?,
            items_processed: self.items_processed as u32,
            items_created: self.items_created as u32,
            items_updated: self.items_updated as u32,
            cursor_ts: self.cursor_ts.as_deref().map(parse_datetime).transpose()?,
            errors,
        })
    }
}

fn errors_json(errors: &[SyncErrorEntry]) -> Result<String, RepositoryError> {
    serde_json::to_string(errors)
        .map_err(|e| RepositoryError::Query(format!("errors encode: {e}")))
}

impl SyncRunRepository for SqliteSyncRunRepository {
    async fn create(&self, run: &SyncRun) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO sync_runs
               (id, scope, mode, status, started_at, finished_at,
                items_processed, items_created, items_updated, cursor_ts, errors)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(run.id.to_string())
        .bind(run.scope.to_string())
        .bind(run.mode.to_string())
        .bind(run.status.to_string())
        .bind(format_datetime(&run.started_at))
        .bind(run.finished_at.as_ref().map(format_datetime))
        .bind(run.items_processed as i64)
        .bind(run.items_created as i64)
        .bind(run.items_updated as i64)
        .bind(run.cursor_ts.as_ref().map(format_datetime))
        .bind(errors_json(&run.errors)?)
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(())
    }

    async fn update(&self, run: &SyncRun) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"UPDATE sync_runs
               SET status = ?, finished_at = ?, items_processed = ?, items_created = ?,
                   items_updated = ?, cursor_ts = ?, errors = ?
               WHERE id = ?"#,
        )
        .bind(run.status.to_string())
        .bind(run.finished_at.as_ref().map(format_datetime))
        .bind(run.items_processed as i64)
        .bind(run.items_created as i64)
        .bind(run.items_updated as i64)
        .bind(run.cursor_ts.as_ref().map(format_datetime))
        .bind(errors_json(&run.errors)?)
        .bind(run.id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<SyncRun>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM sync_runs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        match row {
            Some(row) => Ok(Some(SyncRunRow::from_row(&row).map_err(query_err)?.into_run()?)),
            None => Ok(None),
        }
    }

    async fn latest_completed(
        &self,
        scope: &SyncScope,
    ) -> Result<Option<SyncRun>, RepositoryError> {
        let row = sqlx::query(
            r#"SELECT * FROM sync_runs
               WHERE scope = ? AND status = 'completed'
               ORDER BY started_at DESC
               LIMIT 1"#,
        )
        .bind(scope.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_err)?;

        match row {
            Some(row) => Ok(Some(SyncRunRow::from_row(&row).map_err(query_err)?.into_run()?)),
            None => Ok(None),
        }
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<SyncRun>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM sync_runs ORDER BY started_at DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        let mut runs = Vec::with_capacity(rows.len());
        for row in &rows {
            runs.push(SyncRunRow::from_row(row).map_err(query_err)?.into_run()?);
        }
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::testutil::temp_pool;
    use chrono::{Duration, Utc};
    use dmbridge_types::sync::SyncErrorKind;

    #[tokio::test]
    async fn test_create_update_find() {
        let repo = SqliteSyncRunRepository::new(temp_pool().await);

        let mut run = SyncRun::new(SyncScope::Account, SyncMode::Full, Utc::now());
        repo.create(&run).await.unwrap();

        run.status = SyncRunStatus::Completed;
        run.finished_at = Some(Utc::now());
        run.items_processed = 5;
        run.items_created = 5;
        run.cursor_ts = Some(Utc::now());
        run.errors.push(SyncErrorEntry::new(
            SyncErrorKind::Validation,
            Some("m9".to_string()),
            "missing sender",
        ));
        repo.update(&run).await.unwrap();

        let stored = repo.find_by_id(&run.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SyncRunStatus::Completed);
        assert_eq!(stored.items_created, 5);
        assert_eq!(stored.errors.len(), 1);
        assert_eq!(stored.errors[0].item_id.as_deref(), Some("m9"));
        assert_eq!(stored.scope, SyncScope::Account);
    }

    #[tokio::test]
    async fn test_update_missing_run_is_not_found() {
        let repo = SqliteSyncRunRepository::new(temp_pool().await);
        let run = SyncRun::new(SyncScope::Account, SyncMode::Full, Utc::now());
        assert!(matches!(
            repo.update(&run).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_latest_completed_per_scope() {
        let repo = SqliteSyncRunRepository::new(temp_pool().await);
        let base = Utc::now();

        // Older completed account run with a cursor.
        let mut old = SyncRun::new(SyncScope::Account, SyncMode::Full, base - Duration::hours(2));
        old.status = SyncRunStatus::Completed;
        old.cursor_ts = Some(base - Duration::hours(2));
        repo.create(&old).await.unwrap();

        // Newer completed account run.
        let mut newer = SyncRun::new(SyncScope::Account, SyncMode::Incremental, base - Duration::hours(1));
        newer.status = SyncRunStatus::Completed;
        newer.cursor_ts = Some(base - Duration::hours(1));
        repo.create(&newer).await.unwrap();

        // Newest run failed -- must not become the cursor source.
        let mut failed = SyncRun::new(SyncScope::Account, SyncMode::Incremental, base);
        failed.status = SyncRunStatus::Failed;
        repo.create(&failed).await.unwrap();

        // Completed run on another scope -- must not leak across scopes.
        let mut other = SyncRun::new(
            SyncScope::Thread("t1".to_string()),
            SyncMode::Incremental,
            base,
        );
        other.status = SyncRunStatus::Completed;
        repo.create(&other).await.unwrap();

        let latest = repo.latest_completed(&SyncScope::Account).await.unwrap().unwrap();
        assert_eq!(latest.id, newer.id);
    }

    #[tokio::test]
    async fn test_list_recent_ordering_and_limit() {
        let repo = SqliteSyncRunRepository::new(temp_pool().await);
        let base = Utc::now();
        for i in 0..4 {
            let run = SyncRun::new(
                SyncScope::Account,
                SyncMode::Full,
                base + Duration::seconds(i),
            );
            repo.create(&run).await.unwrap();
        }

        let recent = repo.list_recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent[0].started_at >= recent[1].started_at);
    }
}
