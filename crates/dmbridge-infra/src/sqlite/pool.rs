//! Database pool with split reader/writer connections in WAL mode.
//!
//! SQLite allows one writer at a time. `DatabasePool` keeps a
//! multi-connection reader pool for concurrent SELECTs next to a
//! single-connection writer pool that serializes all mutation, so parallel
//! sync scopes and dispatcher reads never contend on the write lock.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Split read/write pool for SQLite with WAL mode.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open (creating if missing) the database and run migrations.
    ///
    /// Both pools use WAL journal mode, enforced foreign keys, and a
    /// 5-second busy timeout. Migrations run on the writer before the
    /// reader pool opens.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let base_opts = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(5))
            .create_if_missing(true);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(base_opts.clone())
            .await?;

        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(base_opts.read_only(true))
            .await?;

        Ok(Self { reader, writer })
    }
}

/// Default database URL under `DMBRIDGE_DATA_DIR`, falling back to
/// `~/.dmbridge/dmbridge.db`.
pub fn default_database_url() -> String {
    let data_dir = std::env::var("DMBRIDGE_DATA_DIR").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{home}/.dmbridge")
    });
    format!("sqlite://{data_dir}/dmbridge.db")
}
