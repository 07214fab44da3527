//! Shared domain types for the DM bridge.
//!
//! This crate contains the entities mirrored from the source platform
//! (users, threads, messages), the relay-side chat session, sync-run
//! bookkeeping, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod message;
pub mod page;
pub mod session;
pub mod sync;
pub mod thread;
pub mod user;
