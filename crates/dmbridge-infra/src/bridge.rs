//! Composition root.
//!
//! Wires the SQLite pool and repositories into the core services. The bot
//! dispatcher process builds one `Bridge` at startup and hands intents to
//! `sessions`, `queries`, and `coordinator`.

use dmbridge_core::query::QueryService;
use dmbridge_core::session::SessionService;
use dmbridge_core::source::SourceClient;
use dmbridge_core::sync::{SyncCoordinator, SyncSettings};
use dmbridge_types::config::BridgeConfig;

use crate::sqlite::message::SqliteMessageRepository;
use crate::sqlite::pool::{default_database_url, DatabasePool};
use crate::sqlite::session::SqliteSessionRepository;
use crate::sqlite::sync_run::SqliteSyncRunRepository;
use crate::sqlite::thread::SqliteThreadRepository;
use crate::sqlite::user::SqliteUserRepository;

/// The assembled sync engine over one database and one source client.
pub struct Bridge<C: SourceClient> {
    pool: DatabasePool,
    pub coordinator: SyncCoordinator<
        SqliteUserRepository,
        SqliteThreadRepository,
        SqliteMessageRepository,
        SqliteSyncRunRepository,
        C,
    >,
    pub sessions: SessionService<SqliteSessionRepository, SqliteThreadRepository>,
    pub queries: QueryService<SqliteThreadRepository, SqliteMessageRepository>,
}

impl<C: SourceClient> Bridge<C> {
    /// Open (and migrate) the database and assemble the services.
    pub async fn connect(config: &BridgeConfig, client: C) -> Result<Self, sqlx::Error> {
        let url = config
            .database_url
            .clone()
            .unwrap_or_else(default_database_url);
        let pool = DatabasePool::new(&url).await?;

        let coordinator = SyncCoordinator::new(
            SqliteUserRepository::new(pool.clone()),
            SqliteThreadRepository::new(pool.clone()),
            SqliteMessageRepository::new(pool.clone()),
            SqliteSyncRunRepository::new(pool.clone()),
            client,
            SyncSettings::from_config(config),
        );
        let sessions = SessionService::new(
            SqliteSessionRepository::new(pool.clone()),
            SqliteThreadRepository::new(pool.clone()),
        );
        let queries = QueryService::new(
            SqliteThreadRepository::new(pool.clone()),
            SqliteMessageRepository::new(pool.clone()),
        );

        Ok(Self {
            pool,
            coordinator,
            sessions,
            queries,
        })
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use dmbridge_core::source::{FetchedMessage, FetchedThread, FetchedUser};
    use dmbridge_types::error::{SessionError, SourceError, SyncError};
    use dmbridge_types::page::Page;
    use dmbridge_types::session::PreferencesPatch;
    use dmbridge_types::sync::{SyncErrorKind, SyncMode, SyncRunStatus, SyncScope};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Fake source client replaying scripted fixtures.
    #[derive(Clone, Default)]
    struct ScriptedClient {
        threads: Vec<FetchedThread>,
        messages: HashMap<String, Vec<FetchedMessage>>,
        /// Artificial latency per fetch, for lock/timeout tests.
        delay: Option<std::time::Duration>,
        fail_thread_fetch: bool,
        /// `since` arguments observed by fetch_messages.
        since_log: Arc<Mutex<Vec<Option<DateTime<Utc>>>>>,
    }

    impl SourceClient for ScriptedClient {
        async fn fetch_threads(&self, _limit: u32) -> Result<Vec<FetchedThread>, SourceError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_thread_fetch {
                return Err(SourceError::Unavailable("scripted outage".to_string()));
            }
            Ok(self.threads.clone())
        }

        async fn fetch_messages(
            &self,
            thread_id: &str,
            since: Option<DateTime<Utc>>,
            _limit: u32,
        ) -> Result<Vec<FetchedMessage>, SourceError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.since_log.lock().unwrap().push(since);
            let messages = self.messages.get(thread_id).cloned().unwrap_or_default();
            Ok(match since {
                Some(since) => messages
                    .into_iter()
                    .filter(|m| m.sent_at.map(|ts| ts > since).unwrap_or(true))
                    .collect(),
                None => messages,
            })
        }

        async fn send_message(&self, _thread_id: &str, _text: &str) -> Result<String, SourceError> {
            Ok("m_sent".to_string())
        }
    }

    fn user(id: &str, name: &str) -> FetchedUser {
        FetchedUser {
            user_id: Some(id.to_string()),
            username: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn thread(id: &str, users: Vec<FetchedUser>) -> FetchedThread {
        FetchedThread {
            thread_id: Some(id.to_string()),
            users,
            ..Default::default()
        }
    }

    fn message(id: &str, thread_id: &str, sender: &str, text: &str, sent_secs: i64) -> FetchedMessage {
        FetchedMessage {
            message_id: Some(id.to_string()),
            thread_id: Some(thread_id.to_string()),
            sender_id: Some(sender.to_string()),
            kind: Some("text".to_string()),
            text: Some(text.to_string()),
            sent_at: Some(Utc.timestamp_opt(sent_secs, 0).unwrap()),
            ..Default::default()
        }
    }

    /// Two threads, three messages: two in A, one in B.
    fn scenario_client() -> ScriptedClient {
        let mut messages = HashMap::new();
        messages.insert(
            "ta".to_string(),
            vec![
                message("m1", "ta", "u1", "hey", 1_000),
                message("m2", "ta", "u2", "hi back", 2_000),
            ],
        );
        messages.insert(
            "tb".to_string(),
            vec![message("m3", "tb", "u3", "lunch?", 1_500)],
        );
        ScriptedClient {
            threads: vec![
                thread("ta", vec![user("u1", "ana"), user("u2", "bo")]),
                thread("tb", vec![user("u1", "ana"), user("u3", "cy")]),
            ],
            messages,
            ..Default::default()
        }
    }

    fn test_config() -> BridgeConfig {
        BridgeConfig::default()
    }

    async fn temp_bridge(config: &mut BridgeConfig, client: ScriptedClient) -> Bridge<ScriptedClient> {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("bridge.db");
        config.database_url = Some(format!("sqlite://{}?mode=rwc", db_path.display()));
        std::mem::forget(dir);
        Bridge::connect(config, client).await.unwrap()
    }

    #[tokio::test]
    async fn test_scenario_full_sync_counts_and_invariant() {
        let mut config = test_config();
        let bridge = temp_bridge(&mut config, scenario_client()).await;

        let run = bridge
            .coordinator
            .trigger(SyncScope::Account, SyncMode::Full)
            .await
            .unwrap();

        assert_eq!(run.status, SyncRunStatus::Completed);
        assert_eq!(run.items_created, 5);
        assert_eq!(run.items_updated, 0);
        assert!(run.errors.is_empty());

        // Every stored message references a stored thread.
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT m.message_id FROM messages m LEFT JOIN threads t ON t.thread_id = m.thread_id WHERE t.thread_id IS NULL",
        )
        .fetch_all(&bridge.pool().reader)
        .await
        .unwrap();
        assert!(rows.is_empty());

        let threads = bridge.queries.list_threads("u1", Page::default()).await.unwrap();
        assert_eq!(threads.len(), 2);

        let messages = bridge
            .queries
            .list_messages("ta", Page::default(), None)
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].message_id, "m2");
    }

    #[tokio::test]
    async fn test_reingest_is_idempotent() {
        let mut config = test_config();
        let bridge = temp_bridge(&mut config, scenario_client()).await;

        let first = bridge
            .coordinator
            .trigger(SyncScope::Account, SyncMode::Full)
            .await
            .unwrap();
        assert_eq!(first.items_created, 5);

        let second = bridge
            .coordinator
            .trigger(SyncScope::Account, SyncMode::Full)
            .await
            .unwrap();
        assert_eq!(second.status, SyncRunStatus::Completed);
        assert_eq!(second.items_created, 0);
        assert!(second.items_updated <= 5);

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages")
            .fetch_one(&bridge.pool().reader)
            .await
            .unwrap();
        assert_eq!(count.0, 3);
    }

    #[tokio::test]
    async fn test_concurrent_triggers_one_wins() {
        let mut config = test_config();
        let mut client = scenario_client();
        client.delay = Some(std::time::Duration::from_millis(300));
        let bridge = Arc::new(temp_bridge(&mut config, client).await);

        let winner = {
            let bridge = Arc::clone(&bridge);
            tokio::spawn(async move {
                bridge
                    .coordinator
                    .trigger(SyncScope::Account, SyncMode::Full)
                    .await
            })
        };

        // Let the first trigger take the scope lock.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let loser = bridge
            .coordinator
            .trigger(SyncScope::Account, SyncMode::Full)
            .await;
        assert!(matches!(loser, Err(SyncError::AlreadyRunning(ref key)) if key == "account"));

        let run = winner.await.unwrap().unwrap();
        assert_eq!(run.status, SyncRunStatus::Completed);

        // Lock released after the terminal state: a fresh trigger goes through.
        assert!(bridge
            .coordinator
            .trigger(SyncScope::Account, SyncMode::Full)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_thread_scoped_sync_runs_in_parallel_scope() {
        let mut config = test_config();
        let bridge = temp_bridge(&mut config, scenario_client()).await;

        bridge
            .coordinator
            .trigger(SyncScope::Account, SyncMode::Full)
            .await
            .unwrap();

        let run = bridge
            .coordinator
            .trigger(SyncScope::Thread("ta".to_string()), SyncMode::Full)
            .await
            .unwrap();
        assert_eq!(run.status, SyncRunStatus::Completed);
        // Only the two messages of thread A are in scope.
        assert_eq!(run.items_processed, 2);
    }

    #[tokio::test]
    async fn test_thread_scope_unknown_thread_fails() {
        let mut config = test_config();
        let bridge = temp_bridge(&mut config, scenario_client()).await;

        let run = bridge
            .coordinator
            .trigger(SyncScope::Thread("ghost".to_string()), SyncMode::Full)
            .await
            .unwrap();
        assert_eq!(run.status, SyncRunStatus::Failed);
        assert!(run.errors.iter().any(|e| e.detail.contains("ghost")));
    }

    #[tokio::test]
    async fn test_incremental_cursor_overlaps_but_never_exceeds() {
        let mut config = test_config();
        config.cursor_overlap_secs = 120;
        let client = scenario_client();
        let since_log = Arc::clone(&client.since_log);
        let bridge = temp_bridge(&mut config, client).await;

        let first = bridge
            .coordinator
            .trigger(SyncScope::Account, SyncMode::Full)
            .await
            .unwrap();
        let max_ts = Utc.timestamp_opt(2_000, 0).unwrap();
        assert_eq!(first.cursor_ts, Some(max_ts));

        since_log.lock().unwrap().clear();
        let second = bridge
            .coordinator
            .trigger(SyncScope::Account, SyncMode::Incremental)
            .await
            .unwrap();
        assert_eq!(second.status, SyncRunStatus::Completed);
        assert_eq!(second.items_created, 0);

        let observed = since_log.lock().unwrap().clone();
        assert!(!observed.is_empty());
        for since in observed {
            let since = since.expect("incremental fetch must carry a cursor");
            assert_eq!(since, Utc.timestamp_opt(1_880, 0).unwrap());
            assert!(since <= max_ts);
        }

        // An idle incremental run carries the cursor forward.
        assert_eq!(second.cursor_ts, Some(max_ts));
    }

    #[tokio::test]
    async fn test_run_timeout_marks_failed_and_releases_lock() {
        let mut config = test_config();
        config.run_timeout_secs = 0;
        let mut client = scenario_client();
        client.delay = Some(std::time::Duration::from_millis(200));
        let bridge = temp_bridge(&mut config, client).await;

        let run = bridge
            .coordinator
            .trigger(SyncScope::Account, SyncMode::Full)
            .await
            .unwrap();
        assert_eq!(run.status, SyncRunStatus::Failed);
        assert!(run
            .errors
            .iter()
            .any(|e| matches!(e.kind, SyncErrorKind::Timeout)));

        // The scope lock is free again.
        let again = bridge
            .coordinator
            .trigger(SyncScope::Account, SyncMode::Full)
            .await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_upstream_outage_fails_run() {
        let mut config = test_config();
        let mut client = scenario_client();
        client.fail_thread_fetch = true;
        let bridge = temp_bridge(&mut config, client).await;

        let run = bridge
            .coordinator
            .trigger(SyncScope::Account, SyncMode::Full)
            .await
            .unwrap();
        assert_eq!(run.status, SyncRunStatus::Failed);
        assert!(run
            .errors
            .iter()
            .any(|e| matches!(e.kind, SyncErrorKind::Upstream)));
    }

    #[tokio::test]
    async fn test_malformed_item_recorded_batch_continues() {
        let mut config = test_config();
        let mut client = scenario_client();
        client
            .messages
            .get_mut("ta")
            .unwrap()
            .push(FetchedMessage {
                message_id: Some("m_bad".to_string()),
                thread_id: Some("ta".to_string()),
                sender_id: None,
                kind: Some("text".to_string()),
                text: Some("orphan".to_string()),
                sent_at: Some(Utc.timestamp_opt(3_000, 0).unwrap()),
                ..Default::default()
            });
        let bridge = temp_bridge(&mut config, client).await;

        let run = bridge
            .coordinator
            .trigger(SyncScope::Account, SyncMode::Full)
            .await
            .unwrap();
        assert_eq!(run.status, SyncRunStatus::Completed);
        assert_eq!(run.items_created, 5);
        let validation: Vec<_> = run
            .errors
            .iter()
            .filter(|e| matches!(e.kind, SyncErrorKind::Validation))
            .collect();
        assert_eq!(validation.len(), 1);
        assert_eq!(validation[0].item_id.as_deref(), Some("m_bad"));
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let mut config = test_config();
        let bridge = temp_bridge(&mut config, scenario_client()).await;
        bridge
            .coordinator
            .trigger(SyncScope::Account, SyncMode::Full)
            .await
            .unwrap();

        // First contact creates; second call returns the same row.
        let session = bridge.sessions.get_or_create(7).await.unwrap();
        let again = bridge.sessions.get_or_create(7).await.unwrap();
        assert_eq!(session.created_at, again.created_at);

        // Selecting before linking is rejected.
        let err = bridge.sessions.select_thread(7, "ta").await.unwrap_err();
        assert!(matches!(err, SessionError::NotLinked(7)));

        bridge.sessions.link_identity(7, "u2".to_string()).await.unwrap();

        // u2 participates in ta but not tb.
        let session = bridge.sessions.select_thread(7, "ta").await.unwrap();
        assert_eq!(session.current_thread_id.as_deref(), Some("ta"));

        let err = bridge.sessions.select_thread(7, "tb").await.unwrap_err();
        assert!(matches!(err, SessionError::ThreadNotFound(_)));
        // Failed selection leaves the stored selection unchanged.
        let stored = bridge.sessions.get_or_create(7).await.unwrap();
        assert_eq!(stored.current_thread_id.as_deref(), Some("ta"));

        // Absent thread is the same error as a non-member thread.
        let err = bridge.sessions.select_thread(7, "ghost").await.unwrap_err();
        assert!(matches!(err, SessionError::ThreadNotFound(_)));

        // Back to the thread list.
        let session = bridge.sessions.clear_thread(7).await.unwrap();
        assert!(session.current_thread_id.is_none());
    }

    #[tokio::test]
    async fn test_relink_clears_selection() {
        let mut config = test_config();
        let bridge = temp_bridge(&mut config, scenario_client()).await;
        bridge
            .coordinator
            .trigger(SyncScope::Account, SyncMode::Full)
            .await
            .unwrap();

        bridge.sessions.link_identity(7, "u1".to_string()).await.unwrap();
        bridge.sessions.select_thread(7, "tb").await.unwrap();

        let session = bridge.sessions.link_identity(7, "u3".to_string()).await.unwrap();
        assert!(session.current_thread_id.is_none());

        // Re-linking the same identity keeps the selection.
        bridge.sessions.select_thread(7, "tb").await.unwrap();
        let session = bridge.sessions.link_identity(7, "u3".to_string()).await.unwrap();
        assert_eq!(session.current_thread_id.as_deref(), Some("tb"));
    }

    #[tokio::test]
    async fn test_poller_triggers_until_cancelled() {
        let mut config = test_config();
        let bridge = Arc::new(temp_bridge(&mut config, scenario_client()).await);
        let shutdown = tokio_util::sync::CancellationToken::new();

        let poller = {
            let bridge = Arc::clone(&bridge);
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                dmbridge_core::sync::poller::run_periodic(
                    &bridge.coordinator,
                    SyncScope::Account,
                    SyncMode::Incremental,
                    std::time::Duration::from_millis(10),
                    shutdown,
                )
                .await
            })
        };

        tokio::time::sleep(std::time::Duration::from_millis(80)).await;
        shutdown.cancel();
        poller.await.unwrap();

        let runs = bridge.coordinator.recent_runs(10).await.unwrap();
        assert!(!runs.is_empty());
        assert!(runs.iter().all(|r| r.status.is_terminal()));
    }

    #[tokio::test]
    async fn test_preferences_merge_and_search() {
        let mut config = test_config();
        let bridge = temp_bridge(&mut config, scenario_client()).await;
        bridge
            .coordinator
            .trigger(SyncScope::Account, SyncMode::Full)
            .await
            .unwrap();

        bridge.sessions.get_or_create(7).await.unwrap();
        let session = bridge
            .sessions
            .update_preferences(
                7,
                &PreferencesPatch {
                    language: Some("de".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(session.preferences.language, "de");
        assert_eq!(session.preferences.timezone, "UTC");

        let hits = bridge
            .queries
            .search_messages("u1", "lunch", Page::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].message_id, "m3");

        // u2 is not in thread B, so the same search finds nothing.
        let none = bridge
            .queries
            .search_messages("u2", "lunch", Page::default())
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
