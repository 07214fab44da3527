//! Source-user repository trait.

use dmbridge_types::error::RepositoryError;
use dmbridge_types::user::SourceUser;

use super::UpsertOutcome;

/// Persistence for source-platform user profiles.
pub trait UserRepository: Send + Sync {
    /// Insert the user or refresh the profile fields of an existing row.
    /// `created_at` of an existing row is preserved.
    fn upsert(
        &self,
        user: &SourceUser,
    ) -> impl std::future::Future<Output = Result<UpsertOutcome, RepositoryError>> + Send;

    fn find_by_user_id(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<SourceUser>, RepositoryError>> + Send;

    /// Username lookup used by the identity-linking flow.
    fn find_by_username(
        &self,
        username: &str,
    ) -> impl std::future::Future<Output = Result<Option<SourceUser>, RepositoryError>> + Send;
}
