//! SQLite message repository.
//!
//! Messages are append-mostly: an upsert for a known `message_id` writes
//! nothing. When the incoming payload differs from the stored one the
//! mismatch is logged as a conflict and the stored record wins.

use chrono::{DateTime, Utc};
use dmbridge_core::repository::{MessageRepository, UpsertOutcome};
use dmbridge_types::error::RepositoryError;
use dmbridge_types::message::{Message, MessageKind};
use dmbridge_types::page::Page;
use sqlx::Row;
use tracing::warn;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_err};

/// SQLite-backed implementation of `MessageRepository`.
#[derive(Clone)]
pub struct SqliteMessageRepository {
    pool: DatabasePool,
}

impl SqliteMessageRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn fetch_many<'q>(
        &self,
        query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    ) -> Result<Vec<Message>, RepositoryError> {
        let rows = query
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            messages.push(MessageRow::from_row(row).map_err(query_err)?.into_message()?);
        }
        Ok(messages)
    }
}

struct MessageRow {
    message_id: String,
    thread_id: String,
    sender_id: String,
    kind: String,
    text: String,
    media_urls: String,
    reply_to: Option<String>,
    sent_at: String,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            message_id: row.try_get("message_id")?,
            thread_id: row.try_get("thread_id")?,
            sender_id: row.try_get("sender_id")?,
            kind: row.try_get("kind")?,
            text: row.try_get("text")?,
            media_urls: row.try_get("media_urls")?,
            reply_to: row.try_get("reply_to")?,
            sent_at: row.try_get("sent_at")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<Message, RepositoryError> {
        let kind: MessageKind = self
            .kind
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let media_urls: Vec<String> = serde_json::from_str(&self.media_urls)
            .map_err(|e| RepositoryError::Query(format!("invalid media_urls json: {e}")))?;
        Ok(Message {
            message_id: self.message_id,
            thread_id: self.thread_id,
            sender_id: self.sender_id,
            kind,
            text: self.text,
            media_urls,
            reply_to: self.reply_to,
            sent_at: parse_datetime(&self.sent_at)?,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

impl MessageRepository for SqliteMessageRepository {
    async fn upsert(&self, message: &Message) -> Result<UpsertOutcome, RepositoryError> {
        if let Some(stored) = self.find_by_message_id(&message.message_id).await? {
            if stored.text != message.text {
                warn!(
                    message_id = %message.message_id,
                    "payload conflict on re-ingest, stored record wins"
                );
            }
            return Ok(UpsertOutcome::Updated);
        }

        let media_urls = serde_json::to_string(&message.media_urls)
            .map_err(|e| RepositoryError::Query(format!("media_urls encode: {e}")))?;

        // ON CONFLICT DO NOTHING backstops a concurrent insert from another
        // scope fetching an overlapping window.
        let result = sqlx::query(
            r#"INSERT INTO messages
               (message_id, thread_id, sender_id, kind, text, media_urls, reply_to, sent_at, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(message_id) DO NOTHING"#,
        )
        .bind(&message.message_id)
        .bind(&message.thread_id)
        .bind(&message.sender_id)
        .bind(message.kind.to_string())
        .bind(&message.text)
        .bind(media_urls)
        .bind(&message.reply_to)
        .bind(format_datetime(&message.sent_at))
        .bind(format_datetime(&message.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        if result.rows_affected() == 0 {
            return Ok(UpsertOutcome::Updated);
        }
        Ok(UpsertOutcome::Created)
    }

    async fn find_by_message_id(
        &self,
        message_id: &str,
    ) -> Result<Option<Message>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM messages WHERE message_id = ?")
            .bind(message_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        match row {
            Some(row) => Ok(Some(MessageRow::from_row(&row).map_err(query_err)?.into_message()?)),
            None => Ok(None),
        }
    }

    async fn list_for_thread(
        &self,
        thread_id: &str,
        page: Page,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Message>, RepositoryError> {
        match since {
            Some(since) => {
                self.fetch_many(
                    sqlx::query(
                        r#"SELECT * FROM messages
                           WHERE thread_id = ? AND sent_at > ?
                           ORDER BY sent_at DESC
                           LIMIT ? OFFSET ?"#,
                    )
                    .bind(thread_id.to_string())
                    .bind(format_datetime(&since))
                    .bind(page.limit as i64)
                    .bind(page.offset as i64),
                )
                .await
            }
            None => {
                self.fetch_many(
                    sqlx::query(
                        r#"SELECT * FROM messages
                           WHERE thread_id = ?
                           ORDER BY sent_at DESC
                           LIMIT ? OFFSET ?"#,
                    )
                    .bind(thread_id.to_string())
                    .bind(page.limit as i64)
                    .bind(page.offset as i64),
                )
                .await
            }
        }
    }

    async fn search(
        &self,
        participant_user_id: &str,
        query: &str,
        page: Page,
    ) -> Result<Vec<Message>, RepositoryError> {
        // `?` in LIKE with escaped wildcards so user input cannot widen the
        // match.
        let pattern = format!(
            "%{}%",
            query.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
        );

        self.fetch_many(
            sqlx::query(
                r#"SELECT m.* FROM messages m
                   JOIN threads t ON t.thread_id = m.thread_id
                   WHERE m.text LIKE ? ESCAPE '\'
                     AND EXISTS (SELECT 1 FROM json_each(t.participants) WHERE json_each.value = ?)
                   ORDER BY m.sent_at DESC
                   LIMIT ? OFFSET ?"#,
            )
            .bind(pattern)
            .bind(participant_user_id.to_string())
            .bind(page.limit as i64)
            .bind(page.offset as i64),
        )
        .await
    }
}
