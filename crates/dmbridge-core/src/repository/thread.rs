//! Thread repository trait.

use dmbridge_types::error::RepositoryError;
use dmbridge_types::page::Page;
use dmbridge_types::thread::Thread;

use super::UpsertOutcome;

/// Persistence for mirrored threads.
pub trait ThreadRepository: Send + Sync {
    /// Insert the thread or update an existing row. Participant sets are
    /// merged as a union -- a stored participant is never removed by an
    /// upsert carrying a smaller set.
    fn upsert(
        &self,
        thread: &Thread,
    ) -> impl std::future::Future<Output = Result<UpsertOutcome, RepositoryError>> + Send;

    fn find_by_thread_id(
        &self,
        thread_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Thread>, RepositoryError>> + Send;

    /// Threads the given source user participates in, most recent activity
    /// first.
    fn list_for_participant(
        &self,
        user_id: &str,
        page: Page,
    ) -> impl std::future::Future<Output = Result<Vec<Thread>, RepositoryError>> + Send;

    /// All known thread ids, for account-scope message sweeps.
    fn list_thread_ids(
        &self,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<String>, RepositoryError>> + Send;
}
