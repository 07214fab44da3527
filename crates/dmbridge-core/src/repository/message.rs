//! Message repository trait.

use chrono::{DateTime, Utc};
use dmbridge_types::error::RepositoryError;
use dmbridge_types::message::Message;
use dmbridge_types::page::Page;

use super::UpsertOutcome;

/// Persistence for mirrored messages.
///
/// Messages are immutable once stored: an upsert for an existing
/// `message_id` never rewrites content. A differing payload is logged as a
/// conflict by the implementation and the stored record wins.
pub trait MessageRepository: Send + Sync {
    fn upsert(
        &self,
        message: &Message,
    ) -> impl std::future::Future<Output = Result<UpsertOutcome, RepositoryError>> + Send;

    fn find_by_message_id(
        &self,
        message_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Message>, RepositoryError>> + Send;

    /// Messages of a thread, newest first. `since` filters on the source
    /// send time (`sent_at`), exclusive.
    fn list_for_thread(
        &self,
        thread_id: &str,
        page: Page,
        since: Option<DateTime<Utc>>,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    /// Substring search over message text, restricted to threads the given
    /// source user participates in. Newest first.
    fn search(
        &self,
        participant_user_id: &str,
        query: &str,
        page: Page,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;
}
