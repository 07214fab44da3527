//! Source-platform conversation threads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A direct-message thread mirrored from the source platform.
///
/// `thread_id` is immutable. `participants` is an ordered set of source
/// user ids that may only grow -- a partial page fetch must never make a
/// previously known participant disappear, so merges are unions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub thread_id: String,
    pub participants: Vec<String>,
    pub title: Option<String>,
    pub is_group: bool,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    /// Whether the given source user is a participant of this thread.
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    /// Merge another participant list into this thread's, keeping existing
    /// order and appending unseen ids in their incoming order.
    pub fn merge_participants(&mut self, incoming: &[String]) {
        for id in incoming {
            if !self.has_participant(id) {
                self.participants.push(id.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread(participants: &[&str]) -> Thread {
        Thread {
            thread_id: "t1".to_string(),
            participants: participants.iter().map(|s| s.to_string()).collect(),
            title: None,
            is_group: false,
            last_activity_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_merge_participants_is_union() {
        let mut t = thread(&["a", "b"]);
        t.merge_participants(&["b".to_string(), "c".to_string()]);
        assert_eq!(t.participants, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_merge_participants_never_drops() {
        let mut t = thread(&["a", "b", "c"]);
        // Partial fetch that only saw one participant.
        t.merge_participants(&["b".to_string()]);
        assert_eq!(t.participants, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_has_participant() {
        let t = thread(&["a", "b"]);
        assert!(t.has_participant("a"));
        assert!(!t.has_participant("z"));
    }
}
