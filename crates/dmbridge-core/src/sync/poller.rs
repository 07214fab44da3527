//! Periodic sync driver.
//!
//! Triggers a sync for one scope on a fixed interval until cancelled. A
//! scope lock rejection means a manual or overlapping run is in flight --
//! the tick is skipped, not queued.

use dmbridge_types::error::SyncError;
use dmbridge_types::sync::{SyncMode, SyncRunStatus, SyncScope};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::repository::{
    MessageRepository, SyncRunRepository, ThreadRepository, UserRepository,
};
use crate::source::SourceClient;

use super::coordinator::SyncCoordinator;

/// Run `coordinator.trigger(scope, mode)` every `interval` until `shutdown`
/// fires. Long runs delay the next tick instead of piling up.
pub async fn run_periodic<U, T, M, R, C>(
    coordinator: &SyncCoordinator<U, T, M, R, C>,
    scope: SyncScope,
    mode: SyncMode,
    interval: std::time::Duration,
    shutdown: CancellationToken,
) where
    U: UserRepository,
    T: ThreadRepository,
    M: MessageRepository,
    R: SyncRunRepository,
    C: SourceClient,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!(scope = %scope, %mode, interval_secs = interval.as_secs(), "sync poller started");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!(scope = %scope, "sync poller stopped");
                return;
            }
            _ = ticker.tick() => {
                match coordinator.trigger(scope.clone(), mode).await {
                    Ok(run) if run.status == SyncRunStatus::Completed => {
                        debug!(sync_id = %run.id, created = run.items_created, "scheduled sync completed");
                    }
                    Ok(run) => {
                        warn!(sync_id = %run.id, errors = run.errors.len(), "scheduled sync failed");
                    }
                    Err(SyncError::AlreadyRunning(key)) => {
                        debug!(scope = %key, "scheduled sync skipped, scope busy");
                    }
                    Err(err) => {
                        warn!(scope = %scope, error = %err, "scheduled sync errored");
                    }
                }
            }
        }
    }
}
