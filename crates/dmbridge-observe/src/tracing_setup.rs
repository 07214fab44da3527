//! Tracing subscriber initialization.
//!
//! The bridge runs as a container whose stdout is the log pipeline, so the
//! subscriber writes either human-readable lines (local development) or
//! JSON lines (deployment). `RUST_LOG` controls filtering either way.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// With `json` set, events are emitted as one JSON object per line for log
/// collectors; otherwise a compact fmt layer is used. Respects `RUST_LOG`
/// via `EnvFilter::from_default_env()`.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been set.
pub fn init_tracing(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::from_default_env();

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?;
    }

    Ok(())
}
