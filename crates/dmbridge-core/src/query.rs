//! Read-side query facade for the relay-bot dispatcher.
//!
//! Point-in-time reads against the store; no locking, no coordination with
//! in-flight sync runs.

use chrono::{DateTime, Utc};
use dmbridge_types::error::RepositoryError;
use dmbridge_types::message::Message;
use dmbridge_types::page::Page;
use dmbridge_types::thread::Thread;

use crate::repository::{MessageRepository, ThreadRepository};

/// Read helpers composed from the thread and message stores.
pub struct QueryService<T, M> {
    threads: T,
    messages: M,
}

impl<T, M> QueryService<T, M>
where
    T: ThreadRepository,
    M: MessageRepository,
{
    pub fn new(threads: T, messages: M) -> Self {
        Self { threads, messages }
    }

    /// Threads the source user participates in, most recent activity first.
    pub async fn list_threads(
        &self,
        source_user_id: &str,
        page: Page,
    ) -> Result<Vec<Thread>, RepositoryError> {
        self.threads.list_for_participant(source_user_id, page).await
    }

    /// Messages of one thread, newest first. Fails with `NotFound` for a
    /// thread the store has never seen.
    pub async fn list_messages(
        &self,
        thread_id: &str,
        page: Page,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Message>, RepositoryError> {
        if self.threads.find_by_thread_id(thread_id).await?.is_none() {
            return Err(RepositoryError::NotFound);
        }
        self.messages.list_for_thread(thread_id, page, since).await
    }

    /// Substring search across all threads the source user participates in.
    pub async fn search_messages(
        &self,
        source_user_id: &str,
        query: &str,
        page: Page,
    ) -> Result<Vec<Message>, RepositoryError> {
        self.messages.search(source_user_id, query, page).await
    }
}
