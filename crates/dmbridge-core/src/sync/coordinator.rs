//! Sync run coordinator.
//!
//! Owns the run state machine (`pending -> running -> {completed, failed}`)
//! for each scope: takes the exclusive scope lock, creates the run record,
//! drives the ingest pipeline under a wall-clock budget, and finalizes the
//! record with counts, errors, and the next cursor. The lock guard is
//! dropped on every exit path, including timeout and bookkeeping failures.

use chrono::Utc;
use dmbridge_types::config::BridgeConfig;
use dmbridge_types::error::SyncError;
use dmbridge_types::sync::{
    SyncErrorEntry, SyncErrorKind, SyncMode, SyncRun, SyncRunStatus, SyncScope,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::ingest::{IngestPipeline, IngestReport};
use crate::repository::{
    MessageRepository, SyncRunRepository, ThreadRepository, UserRepository,
};
use crate::source::SourceClient;

use super::cursor::{incremental_since, next_cursor};
use super::lock::ScopeLockRegistry;

/// Tunables for sync runs, extracted from [`BridgeConfig`].
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub run_timeout: std::time::Duration,
    pub cursor_overlap: chrono::Duration,
    pub thread_page_size: u32,
    pub message_page_size: u32,
}

impl SyncSettings {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            run_timeout: std::time::Duration::from_secs(config.run_timeout_secs),
            cursor_overlap: chrono::Duration::seconds(config.cursor_overlap_secs as i64),
            thread_page_size: config.thread_page_size,
            message_page_size: config.message_page_size,
        }
    }
}

/// Orchestrates sync runs over the repositories and the source client.
pub struct SyncCoordinator<U, T, M, R, C> {
    users: U,
    threads: T,
    messages: M,
    runs: R,
    client: C,
    locks: ScopeLockRegistry,
    settings: SyncSettings,
}

impl<U, T, M, R, C> SyncCoordinator<U, T, M, R, C>
where
    U: UserRepository,
    T: ThreadRepository,
    M: MessageRepository,
    R: SyncRunRepository,
    C: SourceClient,
{
    pub fn new(users: U, threads: T, messages: M, runs: R, client: C, settings: SyncSettings) -> Self {
        Self {
            users,
            threads,
            messages,
            runs,
            client,
            locks: ScopeLockRegistry::new(),
            settings,
        }
    }

    /// Trigger one sync run for a scope.
    ///
    /// Rejects with [`SyncError::AlreadyRunning`] when the scope lock is
    /// held -- contenders are never queued. Otherwise the run executes to a
    /// terminal status and is returned; a failed run is an `Ok` value whose
    /// `status` is [`SyncRunStatus::Failed`], not an error.
    pub async fn trigger(&self, scope: SyncScope, mode: SyncMode) -> Result<SyncRun, SyncError> {
        let key = scope.lock_key();
        let _guard = self
            .locks
            .try_acquire(&key)
            .ok_or_else(|| SyncError::AlreadyRunning(key.clone()))?;

        let latest = self.runs.latest_completed(&scope).await?;
        let previous_cursor = latest.as_ref().and_then(|run| run.cursor_ts);

        let mut run = SyncRun::new(scope.clone(), mode, Utc::now());
        self.runs.create(&run).await?;
        run.status = SyncRunStatus::Running;
        self.runs.update(&run).await?;
        info!(sync_id = %run.id, scope = %scope, %mode, "sync run started");

        // The overlap margin re-fetches a window the idempotent upsert
        // absorbs; full mode ignores the cursor entirely.
        let since = match mode {
            SyncMode::Incremental => {
                incremental_since(latest.as_ref(), self.settings.cursor_overlap)
            }
            SyncMode::Full => None,
        };

        let mut report = IngestReport::default();
        let outcome = tokio::time::timeout(
            self.settings.run_timeout,
            self.execute(&scope, since, &mut report),
        )
        .await;

        run.items_processed = report.items_processed;
        run.items_created = report.items_created;
        run.items_updated = report.items_updated;
        run.errors = report.errors;
        run.finished_at = Some(Utc::now());

        match outcome {
            Ok(Ok(())) => {
                run.cursor_ts = next_cursor(report.newest_message_at, previous_cursor);
                run.status = SyncRunStatus::Completed;
                info!(
                    sync_id = %run.id,
                    created = run.items_created,
                    updated = run.items_updated,
                    errors = run.errors.len(),
                    "sync run completed"
                );
            }
            Ok(Err(err)) => {
                let kind = match &err {
                    SyncError::UnknownThread(_) => SyncErrorKind::Validation,
                    _ => SyncErrorKind::Upstream,
                };
                run.errors.push(SyncErrorEntry::new(kind, None, err.to_string()));
                run.status = SyncRunStatus::Failed;
                warn!(sync_id = %run.id, error = %err, "sync run failed");
            }
            Err(_elapsed) => {
                // Partial upserts already committed stay committed; the next
                // run will find them as already-done.
                run.errors.push(SyncErrorEntry::new(
                    SyncErrorKind::Timeout,
                    None,
                    format!("run exceeded {}s budget", self.settings.run_timeout.as_secs()),
                ));
                run.status = SyncRunStatus::Failed;
                warn!(sync_id = %run.id, "sync run timed out");
            }
        }

        self.runs.update(&run).await?;
        Ok(run)
    }

    /// Read back one run's record.
    pub async fn status(&self, sync_id: &Uuid) -> Result<Option<SyncRun>, SyncError> {
        Ok(self.runs.find_by_id(sync_id).await?)
    }

    /// Recent runs across all scopes, newest first.
    pub async fn recent_runs(&self, limit: u32) -> Result<Vec<SyncRun>, SyncError> {
        Ok(self.runs.list_recent(limit).await?)
    }

    async fn execute(
        &self,
        scope: &SyncScope,
        since: Option<chrono::DateTime<Utc>>,
        report: &mut IngestReport,
    ) -> Result<(), SyncError> {
        let pipeline = IngestPipeline::new(&self.users, &self.threads, &self.messages);

        match scope {
            SyncScope::Account => {
                // A dead thread listing is fatal for the run; per-thread
                // message failures below are not.
                let fetched = self
                    .client
                    .fetch_threads(self.settings.thread_page_size)
                    .await
                    .map_err(|err| SyncError::Upstream(err.to_string()))?;
                pipeline.ingest_threads(fetched, report).await;

                let thread_ids = self
                    .threads
                    .list_thread_ids(self.settings.thread_page_size)
                    .await?;
                for thread_id in thread_ids {
                    match self
                        .client
                        .fetch_messages(&thread_id, since, self.settings.message_page_size)
                        .await
                    {
                        Ok(messages) => pipeline.ingest_messages(messages, report).await,
                        Err(err) => report.errors.push(SyncErrorEntry::new(
                            SyncErrorKind::Upstream,
                            Some(thread_id),
                            err.to_string(),
                        )),
                    }
                }
            }
            SyncScope::Thread(thread_id) => {
                if self.threads.find_by_thread_id(thread_id).await?.is_none() {
                    return Err(SyncError::UnknownThread(thread_id.clone()));
                }
                let messages = self
                    .client
                    .fetch_messages(thread_id, since, self.settings.message_page_size)
                    .await
                    .map_err(|err| SyncError::Upstream(err.to_string()))?;
                pipeline.ingest_messages(messages, report).await;
            }
        }

        Ok(())
    }
}
