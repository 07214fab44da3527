//! Relay-platform chat sessions and preferences.
//!
//! A `ChatSession` is the durable mapping between a relay-platform user and
//! their linked source-platform identity plus current thread context. One row
//! per relay user, created on first contact, never implicitly deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-user preferences, merged field-wise on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub language: String,
    pub timezone: String,
    pub notifications: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            timezone: "UTC".to_string(),
            notifications: true,
        }
    }
}

/// A partial preferences update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferencesPatch {
    pub language: Option<String>,
    pub timezone: Option<String>,
    pub notifications: Option<bool>,
}

impl Preferences {
    /// Apply a patch, replacing only the fields it sets.
    pub fn apply(&mut self, patch: &PreferencesPatch) {
        if let Some(language) = &patch.language {
            self.language = language.clone();
        }
        if let Some(timezone) = &patch.timezone {
            self.timezone = timezone.clone();
        }
        if let Some(notifications) = patch.notifications {
            self.notifications = notifications;
        }
    }
}

/// Where a session sits in the onboarding/browsing state machine.
///
/// Derived from the stored row, never stored itself -- the row's
/// `source_user_id` and `current_thread_id` fields are the source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No confirmed source-platform identity; only onboarding intents apply.
    Unlinked,
    /// Identity linked, no thread selected.
    Linked,
    /// Identity linked and a thread is active.
    ThreadActive,
}

/// The durable session row for one relay-platform user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    /// Relay-platform user identity; the unique session key.
    pub relay_user_id: i64,
    /// Linked source-platform identity, once onboarding confirmed it.
    pub source_user_id: Option<String>,
    /// Currently selected thread; must be one the linked identity
    /// participates in.
    pub current_thread_id: Option<String>,
    pub preferences: Preferences,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl ChatSession {
    /// Fresh session for a relay user who just made first contact.
    pub fn new(relay_user_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            relay_user_id,
            source_user_id: None,
            current_thread_id: None,
            preferences: Preferences::default(),
            created_at: now,
            updated_at: now,
            last_activity_at: now,
        }
    }

    pub fn state(&self) -> SessionState {
        match (&self.source_user_id, &self.current_thread_id) {
            (None, _) => SessionState::Unlinked,
            (Some(_), None) => SessionState::Linked,
            (Some(_), Some(_)) => SessionState::ThreadActive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_unlinked_with_defaults() {
        let session = ChatSession::new(42, Utc::now());
        assert_eq!(session.state(), SessionState::Unlinked);
        assert_eq!(session.preferences.language, "en");
        assert_eq!(session.preferences.timezone, "UTC");
        assert!(session.preferences.notifications);
    }

    #[test]
    fn test_state_transitions_follow_fields() {
        let mut session = ChatSession::new(42, Utc::now());
        session.source_user_id = Some("901".to_string());
        assert_eq!(session.state(), SessionState::Linked);
        session.current_thread_id = Some("t1".to_string());
        assert_eq!(session.state(), SessionState::ThreadActive);
    }

    #[test]
    fn test_thread_without_identity_is_still_unlinked() {
        // A row in this shape should never be written, but the derivation
        // must not claim an active thread without an identity.
        let mut session = ChatSession::new(42, Utc::now());
        session.current_thread_id = Some("t1".to_string());
        assert_eq!(session.state(), SessionState::Unlinked);
    }

    #[test]
    fn test_preferences_patch_merges() {
        let mut prefs = Preferences::default();
        prefs.apply(&PreferencesPatch {
            timezone: Some("Europe/Berlin".to_string()),
            ..Default::default()
        });
        assert_eq!(prefs.timezone, "Europe/Berlin");
        // Untouched fields keep their values.
        assert_eq!(prefs.language, "en");
        assert!(prefs.notifications);
    }
}
