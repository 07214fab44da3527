//! Sync-run repository trait.

use dmbridge_types::error::RepositoryError;
use dmbridge_types::sync::{SyncRun, SyncScope};
use uuid::Uuid;

/// Persistence for sync-run records.
///
/// Runs are created by the coordinator that owns them and mutated by nobody
/// else; once `completed` or `failed` they are never written again.
pub trait SyncRunRepository: Send + Sync {
    fn create(
        &self,
        run: &SyncRun,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn update(
        &self,
        run: &SyncRun,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn find_by_id(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<SyncRun>, RepositoryError>> + Send;

    /// The most recently finished successful run for a scope; the source of
    /// the incremental cursor.
    fn latest_completed(
        &self,
        scope: &SyncScope,
    ) -> impl std::future::Future<Output = Result<Option<SyncRun>, RepositoryError>> + Send;

    /// Recent runs across all scopes, newest first (status surface).
    fn list_recent(
        &self,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<SyncRun>, RepositoryError>> + Send;
}
