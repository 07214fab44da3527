//! Keyed scope locks for sync mutual exclusion.
//!
//! One registry per coordinator. An entry maps a scope lock key to the token
//! of the run holding it; contention is rejected immediately, never queued,
//! so a flood of triggers cannot build a backlog. The guard releases its
//! entry on drop, which covers every exit path -- completion, failure,
//! timeout, and panic unwind alike.

use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// In-process registry of held scope locks.
#[derive(Clone, Default)]
pub struct ScopeLockRegistry {
    held: Arc<DashMap<String, Uuid>>,
}

impl ScopeLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take the lock for a scope key. Returns `None` when another
    /// holder has it.
    pub fn try_acquire(&self, key: &str) -> Option<ScopeLockGuard> {
        let token = Uuid::now_v7();
        let entry = self.held.entry(key.to_string()).or_insert(token);
        if *entry != token {
            return None;
        }
        drop(entry);
        Some(ScopeLockGuard {
            key: key.to_string(),
            token,
            held: Arc::clone(&self.held),
        })
    }

    /// Whether any run currently holds the given scope.
    pub fn is_held(&self, key: &str) -> bool {
        self.held.contains_key(key)
    }
}

/// RAII handle for one held scope lock.
pub struct ScopeLockGuard {
    key: String,
    token: Uuid,
    held: Arc<DashMap<String, Uuid>>,
}

impl Drop for ScopeLockGuard {
    fn drop(&mut self) {
        // Only remove our own entry; a stale guard must not evict a newer
        // holder of the same key.
        self.held.remove_if(&self.key, |_, token| *token == self.token);
    }
}
