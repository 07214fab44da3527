//! Sync orchestration: scope locks, cursor computation, the run
//! coordinator, and the periodic poller.

pub mod coordinator;
pub mod cursor;
pub mod lock;
pub mod poller;

pub use coordinator::{SyncCoordinator, SyncSettings};
pub use lock::{ScopeLockGuard, ScopeLockRegistry};
