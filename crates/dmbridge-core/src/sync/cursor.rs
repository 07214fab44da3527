//! Incremental cursor computation.

use chrono::{DateTime, Duration, Utc};
use dmbridge_types::sync::SyncRun;

/// Compute the `since` bound for an incremental fetch from the scope's most
/// recent completed run.
///
/// The overlap margin is subtracted so that source-side clock skew and
/// pagination races cannot open a gap; the duplicates it re-fetches are
/// absorbed by the idempotent upsert. Returns `None` (fetch everything) when
/// the scope has never completed a run or never ingested a message.
pub fn incremental_since(last: Option<&SyncRun>, overlap: Duration) -> Option<DateTime<Utc>> {
    last.and_then(|run| run.cursor_ts).map(|ts| ts - overlap)
}

/// The cursor a finishing run should record: the newest message it ingested,
/// or the previous cursor carried forward when it ingested nothing. Never
/// moves backwards.
pub fn next_cursor(
    newest_ingested: Option<DateTime<Utc>>,
    previous: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    match (newest_ingested, previous) {
        (Some(new), Some(prev)) => Some(new.max(prev)),
        (Some(new), None) => Some(new),
        (None, prev) => prev,
    }
}
