//! Deduplicating ingest pipeline.
//!
//! Takes fetched thread/message batches, normalizes them, and merges them
//! into the store idempotently. Best-effort, fully-accounted: every input
//! item ends as either a successful upsert or a recorded error entry; one
//! bad item never aborts the batch.
//!
//! Ordering invariant: a batch's threads are upserted before any message
//! referencing them, so `Message.thread_id` always resolves.

pub mod normalize;

use chrono::{DateTime, Utc};
use dmbridge_types::error::RepositoryError;
use dmbridge_types::sync::{SyncErrorEntry, SyncErrorKind};
use tracing::debug;

use crate::repository::{MessageRepository, ThreadRepository, UpsertOutcome, UserRepository};
use crate::source::{FetchedMessage, FetchedThread};

use normalize::{normalize_message, normalize_thread};

/// Accumulated outcome of one ingest run.
///
/// Item counts cover threads and messages; participant profile upserts are
/// enrichment and only contribute to `errors` when they fail.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub items_processed: u32,
    pub items_created: u32,
    pub items_updated: u32,
    pub errors: Vec<SyncErrorEntry>,
    /// Max `sent_at` among ingested messages; feeds the scope cursor.
    pub newest_message_at: Option<DateTime<Utc>>,
}

impl IngestReport {
    fn count(&mut self, outcome: UpsertOutcome) {
        self.items_processed += 1;
        match outcome {
            UpsertOutcome::Created => self.items_created += 1,
            UpsertOutcome::Updated => self.items_updated += 1,
        }
    }

    fn record(&mut self, kind: SyncErrorKind, item_id: Option<String>, detail: impl Into<String>) {
        self.items_processed += 1;
        self.errors.push(SyncErrorEntry::new(kind, item_id, detail));
    }

    fn observe_sent_at(&mut self, sent_at: DateTime<Utc>) {
        self.newest_message_at = Some(match self.newest_message_at {
            Some(current) => current.max(sent_at),
            None => sent_at,
        });
    }
}

/// Merges fetched batches into the store.
pub struct IngestPipeline<'a, U, T, M> {
    users: &'a U,
    threads: &'a T,
    messages: &'a M,
}

impl<'a, U, T, M> IngestPipeline<'a, U, T, M>
where
    U: UserRepository,
    T: ThreadRepository,
    M: MessageRepository,
{
    pub fn new(users: &'a U, threads: &'a T, messages: &'a M) -> Self {
        Self {
            users,
            threads,
            messages,
        }
    }

    /// Ingest a fetched thread page. Returns the ids of threads that made it
    /// into the store in this batch (the candidates for message fetches).
    pub async fn ingest_threads(
        &self,
        fetched: Vec<FetchedThread>,
        report: &mut IngestReport,
    ) -> Vec<String> {
        let mut stored_ids = Vec::with_capacity(fetched.len());

        for raw in fetched {
            let (thread, users) = match normalize_thread(&raw, Utc::now()) {
                Ok(pair) => pair,
                Err(rejection) => {
                    debug!(reason = %rejection.reason, "skipping malformed thread");
                    report.record(SyncErrorKind::Validation, rejection.item_id, rejection.reason);
                    continue;
                }
            };

            // Profile enrichment first; a failed profile refresh is recorded
            // but does not block the thread itself.
            for user in &users {
                if let Err(err) = self.users.upsert(user).await {
                    report.errors.push(SyncErrorEntry::new(
                        SyncErrorKind::Storage,
                        Some(user.user_id.clone()),
                        store_detail("user upsert", &err),
                    ));
                }
            }

            match self.threads.upsert(&thread).await {
                Ok(outcome) => {
                    report.count(outcome);
                    stored_ids.push(thread.thread_id);
                }
                Err(err) => {
                    report.record(
                        SyncErrorKind::Storage,
                        Some(thread.thread_id),
                        store_detail("thread upsert", &err),
                    );
                }
            }
        }

        stored_ids
    }

    /// Ingest a fetched message batch. Threads referenced by these messages
    /// must already be in the store.
    pub async fn ingest_messages(
        &self,
        fetched: Vec<FetchedMessage>,
        report: &mut IngestReport,
    ) {
        for raw in fetched {
            let message = match normalize_message(&raw, Utc::now()) {
                Ok(message) => message,
                Err(rejection) => {
                    debug!(reason = %rejection.reason, "skipping malformed message");
                    report.record(SyncErrorKind::Validation, rejection.item_id, rejection.reason);
                    continue;
                }
            };

            match self.messages.upsert(&message).await {
                Ok(outcome) => {
                    report.count(outcome);
                    report.observe_sent_at(message.sent_at);
                }
                Err(err) => {
                    report.record(
                        SyncErrorKind::Storage,
                        Some(message.message_id),
                        store_detail("message upsert", &err),
                    );
                }
            }
        }
    }
}

fn store_detail(op: &str, err: &RepositoryError) -> String {
    format!("{op} failed: {err}")
}
