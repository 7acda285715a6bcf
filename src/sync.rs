//! Per-actor serialization.
//!
//! All read-modify-write paths against one actor's documents must run under
//! that actor's lock; operations on different actors proceed in parallel.
//! Locks are created lazily on first use and dropped when the actor is
//! permanently removed.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-actor async mutexes.
#[derive(Debug, Default)]
pub struct ActorLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ActorLocks {
    /// Creates an empty lock registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `actor_id`, creating it on first use.
    ///
    /// The returned guard serializes every mutating operation on that actor;
    /// hold it across the full read-modify-write including the store save,
    /// since the store is what the next operation reads.
    pub async fn acquire(&self, actor_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(actor_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drops the lock entry for a permanently removed actor.
    ///
    /// In-flight holders keep their `Arc` alive; new acquisitions start fresh.
    pub fn remove(&self, actor_id: &str) {
        self.locks.remove(actor_id);
    }

    /// Number of actors with a lock entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no actor currently has a lock entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
