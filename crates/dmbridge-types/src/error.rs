use thiserror::Error;

/// Errors from repository operations (used by trait definitions in
/// dmbridge-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from the source-platform client.
///
/// The client owns auth, rate-limiting, and retries; the core treats these
/// as opaque and records them against the owning sync run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source platform unavailable: {0}")]
    Unavailable(String),

    #[error("send rejected: {0}")]
    SendRejected(String),
}

/// Run-level sync failures surfaced to the caller.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync already running for scope '{0}'")]
    AlreadyRunning(String),

    #[error("sync run exceeded its {0}s budget")]
    Timeout(u64),

    #[error("source platform error: {0}")]
    Upstream(String),

    #[error("unknown thread '{0}' for thread-scoped sync")]
    UnknownThread(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Session and context-manager failures.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no session for relay user {0}")]
    NotFound(i64),

    #[error("relay user {0} has no linked source identity")]
    NotLinked(i64),

    #[error("thread '{0}' not found")]
    ThreadNotFound(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
