//! SQLite thread repository.
//!
//! Participants are stored as a JSON array column and merged as a union on
//! upsert; membership queries go through `json_each`.

use dmbridge_core::repository::{ThreadRepository, UpsertOutcome};
use dmbridge_types::error::RepositoryError;
use dmbridge_types::page::Page;
use dmbridge_types::thread::Thread;
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_err};

/// SQLite-backed implementation of `ThreadRepository`.
#[derive(Clone)]
pub struct SqliteThreadRepository {
    pool: DatabasePool,
}

impl SqliteThreadRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct ThreadRow {
    thread_id: String,
    participants: String,
    title: Option<String>,
    is_group: i64,
    last_activity_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl ThreadRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            thread_id: row.try_get("thread_id")?,
            participants: row.try_get("participants")?,
            title: row.try_get("title")?,
            is_group: row.try_get("is_group")?,
            last_activity_at: row.try_get("last_activity_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_thread(self) -> Result<Thread, RepositoryError> {
        let participants: Vec<String> = serde_json::from_str(&self.participants)
            .map_err(|e| RepositoryError::Query(format!("invalid participants json: {e}")))?;
        Ok(Thread {
            thread_id: self.thread_id,
            participants,
            title: self.title,
            is_group: self.is_group != 0,
            last_activity_at: self
                .last_activity_at
                .as_deref()
                .map(parse_datetime)
                .transpose()?,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn participants_json(participants: &[String]) -> Result<String, RepositoryError> {
    serde_json::to_string(participants)
        .map_err(|e| RepositoryError::Query(format!("participants encode: {e}")))
}

impl ThreadRepository for SqliteThreadRepository {
    async fn upsert(&self, thread: &Thread) -> Result<UpsertOutcome, RepositoryError> {
        let existing = self.find_by_thread_id(&thread.thread_id).await?;

        match existing {
            Some(mut stored) => {
                // Union merge: a partial page must never shrink the stored
                // participant set.
                stored.merge_participants(&thread.participants);

                sqlx::query(
                    r#"UPDATE threads
                       SET participants = ?, title = ?, is_group = ?, last_activity_at = ?, updated_at = ?
                       WHERE thread_id = ?"#,
                )
                .bind(participants_json(&stored.participants)?)
                .bind(thread.title.clone().or_else(|| stored.title.clone()))
                .bind(thread.is_group as i64)
                .bind(
                    thread
                        .last_activity_at
                        .or(stored.last_activity_at)
                        .map(|ts| format_datetime(&ts)),
                )
                .bind(format_datetime(&thread.updated_at))
                .bind(&stored.thread_id)
                .execute(&self.pool.writer)
                .await
                .map_err(query_err)?;

                Ok(UpsertOutcome::Updated)
            }
            None => {
                sqlx::query(
                    r#"INSERT INTO threads
                       (thread_id, participants, title, is_group, last_activity_at, created_at, updated_at)
                       VALUES (?, ?, ?, ?, ?, ?, ?)"#,
                )
                .bind(&thread.thread_id)
                .bind(participants_json(&thread.participants)?)
                .bind(&thread.title)
                .bind(thread.is_group as i64)
                .bind(thread.last_activity_at.map(|ts| format_datetime(&ts)))
                .bind(format_datetime(&thread.created_at))
                .bind(format_datetime(&thread.updated_at))
                .execute(&self.pool.writer)
                .await
                .map_err(query_err)?;

                Ok(UpsertOutcome::Created)
            }
        }
    }

    async fn find_by_thread_id(&self, thread_id: &str) -> Result<Option<Thread>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM threads WHERE thread_id = ?")
            .bind(thread_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        match row {
            Some(row) => Ok(Some(ThreadRow::from_row(&row).map_err(query_err)?.into_thread()?)),
            None => Ok(None),
        }
    }

    async fn list_for_participant(
        &self,
        user_id: &str,
        page: Page,
    ) -> Result<Vec<Thread>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT * FROM threads
               WHERE EXISTS (SELECT 1 FROM json_each(threads.participants) WHERE json_each.value = ?)
               ORDER BY last_activity_at DESC
               LIMIT ? OFFSET ?"#,
        )
        .bind(user_id)
        .bind(page.limit as i64)
        .bind(page.offset as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        let mut threads = Vec::with_capacity(rows.len());
        for row in &rows {
            threads.push(ThreadRow::from_row(row).map_err(query_err)?.into_thread()?);
        }
        Ok(threads)
    }

    async fn list_thread_ids(&self, limit: u32) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT thread_id FROM threads ORDER BY last_activity_at DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter()
            .map(|row| row.try_get("thread_id").map_err(query_err))
            .collect()
    }
}
