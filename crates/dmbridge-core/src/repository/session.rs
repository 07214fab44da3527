//! Chat-session repository trait.

use dmbridge_types::error::RepositoryError;
use dmbridge_types::session::ChatSession;

/// Persistence for relay-user sessions, keyed by the relay user identity.
pub trait SessionRepository: Send + Sync {
    /// Insert or fully replace the session row for its relay user.
    fn upsert(
        &self,
        session: &ChatSession,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn find_by_relay_user(
        &self,
        relay_user_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<ChatSession>, RepositoryError>> + Send;
}
