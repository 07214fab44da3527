//! Business logic and repository trait definitions for the DM bridge.
//!
//! This crate defines the "ports" (repository traits and the source-platform
//! client trait) that the infrastructure layer implements, plus the services
//! built on them: the deduplicating ingest pipeline, the sync coordinator,
//! the session/context manager, and the read-side query facade. It depends
//! only on `dmbridge-types` -- never on `dmbridge-infra` or any database/IO
//! crate.

pub mod ingest;
pub mod query;
pub mod repository;
pub mod session;
pub mod source;
pub mod sync;
