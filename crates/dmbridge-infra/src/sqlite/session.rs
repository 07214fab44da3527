//! SQLite chat-session repository.
//!
//! One row per relay user; preferences travel as a JSON column so new
//! preference fields never need a migration.

use dmbridge_core::repository::SessionRepository;
use dmbridge_types::error::RepositoryError;
use dmbridge_types::session::{ChatSession, Preferences};
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_err};

/// SQLite-backed implementation of `SessionRepository`.
#[derive(Clone)]
pub struct SqliteSessionRepository {
    pool: DatabasePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct SessionRow {
    relay_user_id: i64,
    source_user_id: Option<String>,
    current_thread_id: Option<String>,
    preferences: String,
    created_at: String,
    updated_at: String,
    last_activity_at: String,
}

impl SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            relay_user_id: row.try_get("relay_user_id")?,
            source_user_id: row.try_get("source_user_id")?,
            current_thread_id: row.try_get("current_thread_id")?,
            preferences: row.try_get("preferences")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            last_activity_at: row.try_get("last_activity_at")?,
        })
    }

    fn into_session(self) -> Result<ChatSession, RepositoryError> {
        let preferences: Preferences = serde_json::from_str(&self.preferences)
            .map_err(|e| RepositoryError::Query(format!("invalid preferences json: {e}")))?;
        Ok(ChatSession {
            relay_user_id: self.relay_user_id,
            source_user_id: self.source_user_id,
            current_thread_id: self.current_thread_id,
            preferences,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
            last_activity_at: parse_datetime(&self.last_activity_at)?,
        })
    }
}

impl SessionRepository for SqliteSessionRepository {
    async fn upsert(&self, session: &ChatSession) -> Result<(), RepositoryError> {
        let preferences = serde_json::to_string(&session.preferences)
            .map_err(|e| RepositoryError::Query(format!("preferences encode: {e}")))?;

        sqlx::query(
            r#"INSERT INTO chat_sessions
               (relay_user_id, source_user_id, current_thread_id, preferences,
                created_at, updated_at, last_activity_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(relay_user_id) DO UPDATE SET
                 source_user_id = excluded.source_user_id,
                 current_thread_id = excluded.current_thread_id,
                 preferences = excluded.preferences,
                 updated_at = excluded.updated_at,
                 last_activity_at = excluded.last_activity_at"#,
        )
        .bind(session.relay_user_id)
        .bind(&session.source_user_id)
        .bind(&session.current_thread_id)
        .bind(preferences)
        .bind(format_datetime(&session.created_at))
        .bind(format_datetime(&session.updated_at))
        .bind(format_datetime(&session.last_activity_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(())
    }

    async fn find_by_relay_user(
        &self,
        relay_user_id: i64,
    ) -> Result<Option<ChatSession>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM chat_sessions WHERE relay_user_id = ?")
            .bind(relay_user_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        match row {
            Some(row) => Ok(Some(SessionRow::from_row(&row).map_err(query_err)?.into_session()?)),
            None => Ok(None),
        }
    }
}
