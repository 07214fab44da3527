//! Observability for the DM bridge.

pub mod tracing_setup;
