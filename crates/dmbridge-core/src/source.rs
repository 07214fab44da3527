//! Source-platform client port and the loose wire shapes it returns.
//!
//! The client owns authentication, rate-limiting, and retry policy. The core
//! consumes it as a capability and records its failures opaquely against the
//! owning sync run. Fetched records are deliberately loose -- every field the
//! platform might omit is an `Option` -- and get normalized into the fixed
//! domain shapes at the ingest boundary, never stored raw.

use chrono::{DateTime, Utc};
use dmbridge_types::error::SourceError;
use serde::Deserialize;

/// A user as embedded in a fetched thread page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchedUser {
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub followers: Option<u32>,
    pub following: Option<u32>,
    pub is_verified: Option<bool>,
    pub is_private: Option<bool>,
}

/// A thread as returned by the source platform, before normalization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchedThread {
    pub thread_id: Option<String>,
    pub title: Option<String>,
    pub is_group: Option<bool>,
    #[serde(default)]
    pub users: Vec<FetchedUser>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

/// A message as returned by the source platform, before normalization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchedMessage {
    pub message_id: Option<String>,
    pub thread_id: Option<String>,
    pub sender_id: Option<String>,
    pub kind: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub media_urls: Vec<String>,
    pub reply_to: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// The source-platform API capability consumed by the sync engine.
pub trait SourceClient: Send + Sync {
    /// Fetch a page of the authenticated account's threads.
    fn fetch_threads(
        &self,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<FetchedThread>, SourceError>> + Send;

    /// Fetch messages of one thread, newest portions first from the
    /// platform's view. `since` bounds the fetch to messages sent after the
    /// given instant.
    fn fetch_messages(
        &self,
        thread_id: &str,
        since: Option<DateTime<Utc>>,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<FetchedMessage>, SourceError>> + Send;

    /// Send a text message into a thread; returns the platform-assigned
    /// message id.
    fn send_message(
        &self,
        thread_id: &str,
        text: &str,
    ) -> impl std::future::Future<Output = Result<String, SourceError>> + Send;
}
