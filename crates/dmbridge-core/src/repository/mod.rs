//! Repository trait definitions.
//!
//! Typed ports over the five entity collections, implemented in
//! `dmbridge-infra` (e.g. `SqliteMessageRepository`). All traits use native
//! async fn in traits (RPITIT, Rust 2024 edition) with `Send` futures.
//!
//! The shared contract: `upsert` resolves unique-key collisions as updates,
//! never as errors -- that property is what makes ingest idempotent. Every
//! operation is atomic per document; no multi-document transactions exist
//! anywhere in the design.

pub mod message;
pub mod session;
pub mod sync_run;
pub mod thread;
pub mod user;

pub use message::MessageRepository;
pub use session::SessionRepository;
pub use sync_run::SyncRunRepository;
pub use thread::ThreadRepository;
pub use user::UserRepository;

/// Whether an upsert inserted a new document or touched an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}
