//! Sync-run bookkeeping: scopes, statuses, and per-item error records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// The unit of synchronization: the whole linked account, or a single
/// thread. The scope is both the sync-lock key and the cursor key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SyncScope {
    Account,
    Thread(String),
}

impl SyncScope {
    /// Key used for the exclusive scope lock and for cursor lookups.
    pub fn lock_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SyncScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncScope::Account => write!(f, "account"),
            SyncScope::Thread(id) => write!(f, "thread:{id}"),
        }
    }
}

impl FromStr for SyncScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "account" {
            return Ok(SyncScope::Account);
        }
        match s.strip_prefix("thread:") {
            Some(id) if !id.is_empty() => Ok(SyncScope::Thread(id.to_string())),
            _ => Err(format!("invalid sync scope: '{s}'")),
        }
    }
}

/// Whether a run re-fetches everything or only what changed since the
/// scope's cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    Full,
    Incremental,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Full => write!(f, "full"),
            SyncMode::Incremental => write!(f, "incremental"),
        }
    }
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(SyncMode::Full),
            "incremental" => Ok(SyncMode::Incremental),
            other => Err(format!("invalid sync mode: '{other}'")),
        }
    }
}

/// Lifecycle status of a sync run.
///
/// `pending -> running -> {completed, failed}`; terminal states never
/// transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncRunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl SyncRunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncRunStatus::Completed | SyncRunStatus::Failed)
    }
}

impl fmt::Display for SyncRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncRunStatus::Pending => "pending",
            SyncRunStatus::Running => "running",
            SyncRunStatus::Completed => "completed",
            SyncRunStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SyncRunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(SyncRunStatus::Pending),
            "running" => Ok(SyncRunStatus::Running),
            "completed" => Ok(SyncRunStatus::Completed),
            "failed" => Ok(SyncRunStatus::Failed),
            other => Err(format!("invalid sync run status: '{other}'")),
        }
    }
}

/// Classification of a recorded sync failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncErrorKind {
    /// Malformed fetched record; skipped, batch continues.
    Validation,
    /// Source-platform client failure.
    Upstream,
    /// Store write failure for one item.
    Storage,
    /// The run exceeded its wall-clock budget.
    Timeout,
}

/// One recorded failure inside a sync run.
///
/// Every input item yields either a successful upsert or one of these --
/// never silence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncErrorEntry {
    pub kind: SyncErrorKind,
    pub item_id: Option<String>,
    pub detail: String,
}

impl SyncErrorEntry {
    pub fn new(kind: SyncErrorKind, item_id: Option<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            item_id,
            detail: detail.into(),
        }
    }
}

/// One execution of the ingest pipeline for a scope.
///
/// Created when a trigger wins the scope lock, mutated only by the owning
/// coordinator, terminal once completed or failed.
#[derive(Debug, Clone)]
pub struct SyncRun {
    pub id: Uuid,
    pub scope: SyncScope,
    pub mode: SyncMode,
    pub status: SyncRunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub items_processed: u32,
    pub items_created: u32,
    pub items_updated: u32,
    /// Max message `sent_at` this scope has ever ingested; the base for the
    /// next incremental cursor. Carried forward when a run ingests nothing.
    pub cursor_ts: Option<DateTime<Utc>>,
    pub errors: Vec<SyncErrorEntry>,
}

impl SyncRun {
    /// New run record in the initial `Pending` state.
    pub fn new(scope: SyncScope, mode: SyncMode, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            scope,
            mode,
            status: SyncRunStatus::Pending,
            started_at: now,
            finished_at: None,
            items_processed: 0,
            items_created: 0,
            items_updated: 0,
            cursor_ts: None,
            errors: Vec::new(),
        }
    }
}
