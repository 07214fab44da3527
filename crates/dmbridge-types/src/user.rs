//! Source-platform user profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user on the source platform, as observed through synced threads.
///
/// `user_id` is the immutable key. Profile fields are refreshed every time a
/// sync touches the user, so they reflect the most recent fetch, not history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceUser {
    pub user_id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub followers: Option<u32>,
    pub following: Option<u32>,
    pub is_verified: bool,
    pub is_private: bool,
    /// First time this user was seen by the bridge.
    pub created_at: DateTime<Utc>,
    /// Last profile refresh.
    pub updated_at: DateTime<Utc>,
}
