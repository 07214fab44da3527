//! SQLite source-user repository.
//!
//! Implements `UserRepository` from `dmbridge-core`: raw queries, a private
//! Row struct for SQLite-to-domain mapping, split reader/writer pool usage.

use dmbridge_core::repository::{UpsertOutcome, UserRepository};
use dmbridge_types::error::RepositoryError;
use dmbridge_types::user::SourceUser;
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_err};

/// SQLite-backed implementation of `UserRepository`.
#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: DatabasePool,
}

impl SqliteUserRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, sql: &str, bind: &str) -> Result<Option<SourceUser>, RepositoryError> {
        let row = sqlx::query(sql)
            .bind(bind)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        match row {
            Some(row) => Ok(Some(UserRow::from_row(&row).map_err(query_err)?.into_user()?)),
            None => Ok(None),
        }
    }
}

struct UserRow {
    user_id: String,
    username: String,
    full_name: Option<String>,
    avatar_url: Option<String>,
    followers: Option<i64>,
    following: Option<i64>,
    is_verified: i64,
    is_private: i64,
    created_at: String,
    updated_at: String,
}

impl UserRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            user_id: row.try_get("user_id")?,
            username: row.try_get("username")?,
            full_name: row.try_get("full_name")?,
            avatar_url: row.try_get("avatar_url")?,
            followers: row.try_get("followers")?,
            following: row.try_get("following")?,
            is_verified: row.try_get("is_verified")?,
            is_private: row.try_get("is_private")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_user(self) -> Result<SourceUser, RepositoryError> {
        Ok(SourceUser {
            user_id: self.user_id,
            username: self.username,
            full_name: self.full_name,
            avatar_url: self.avatar_url,
            followers: self.followers.map(|v| v as u32),
            following: self.following.map(|v| v as u32),
            is_verified: self.is_verified != 0,
            is_private: self.is_private != 0,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

impl UserRepository for SqliteUserRepository {
    async fn upsert(&self, user: &SourceUser) -> Result<UpsertOutcome, RepositoryError> {
        let existing = self.find_by_user_id(&user.user_id).await?;

        match existing {
            Some(stored) => {
                // Key and first-seen timestamp are immutable; everything
                // else reflects the latest fetch.
                sqlx::query(
                    r#"UPDATE source_users
                       SET username = ?, full_name = ?, avatar_url = ?, followers = ?,
                           following = ?, is_verified = ?, is_private = ?, updated_at = ?
                       WHERE user_id = ?"#,
                )
                .bind(&user.username)
                .bind(&user.full_name)
                .bind(&user.avatar_url)
                .bind(user.followers.map(|v| v as i64))
                .bind(user.following.map(|v| v as i64))
                .bind(user.is_verified as i64)
                .bind(user.is_private as i64)
                .bind(format_datetime(&user.updated_at))
                .bind(&stored.user_id)
                .execute(&self.pool.writer)
                .await
                .map_err(query_err)?;

                Ok(UpsertOutcome::Updated)
            }
            None => {
                sqlx::query(
                    r#"INSERT INTO source_users
                       (user_id, username, full_name, avatar_url, followers, following,
                        is_verified, is_private, created_at, updated_at)
                       VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
                )
                .bind(&user.user_id)
                .bind(&user.username)
                .bind(&user.full_name)
                .bind(&user.avatar_url)
                .bind(user.followers.map(|v| v as i64))
                .bind(user.following.map(|v| v as i64))
                .bind(user.is_verified as i64)
                .bind(user.is_private as i64)
                .bind(format_datetime(&user.created_at))
                .bind(format_datetime(&user.updated_at))
                .execute(&self.pool.writer)
                .await
                .map_err(query_err)?;

                Ok(UpsertOutcome::Created)
            }
        }
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<SourceUser>, RepositoryError> {
        self.find_one("SELECT * FROM source_users WHERE user_id = ?", user_id)
            .await
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<SourceUser>, RepositoryError> {
        self.find_one("SELECT * FROM source_users WHERE username = ?", username)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::testutil::temp_pool;
    use chrono::Utc;

    fn make_user(id: &str, username: &str) -> SourceUser {
        SourceUser {
            user_id: id.to_string(),
            username: username.to_string(),
            full_name: None,
            avatar_url: None,
            followers: Some(10),
            following: Some(5),
            is_verified: false,
            is_private: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_create_then_update() {
        let repo = SqliteUserRepository::new(temp_pool().await);

        let mut user = make_user("u1", "ana");
        assert_eq!(repo.upsert(&user).await.unwrap(), UpsertOutcome::Created);

        user.followers = Some(11);
        user.full_name = Some("Ana B".to_string());
        assert_eq!(repo.upsert(&user).await.unwrap(), UpsertOutcome::Updated);

        let stored = repo.find_by_user_id("u1").await.unwrap().unwrap();
        assert_eq!(stored.followers, Some(11));
        assert_eq!(stored.full_name.as_deref(), Some("Ana B"));
    }

    #[tokio::test]
    async fn test_created_at_preserved_across_refresh() {
        let repo = SqliteUserRepository::new(temp_pool().await);

        let user = make_user("u1", "ana");
        repo.upsert(&user).await.unwrap();
        let first = repo.find_by_user_id("u1").await.unwrap().unwrap();

        let mut refreshed = make_user("u1", "ana_renamed");
        refreshed.created_at = Utc::now();
        repo.upsert(&refreshed).await.unwrap();

        let second = repo.find_by_user_id("u1").await.unwrap().unwrap();
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.username, "ana_renamed");
    }

    #[tokio::test]
    async fn test_find_by_username() {
        let repo = SqliteUserRepository::new(temp_pool().await);
        repo.upsert(&make_user("u1", "ana")).await.unwrap();

        let found = repo.find_by_username("ana").await.unwrap().unwrap();
        assert_eq!(found.user_id, "u1");
        assert!(repo.find_by_username("nobody").await.unwrap().is_none());
    }
}
