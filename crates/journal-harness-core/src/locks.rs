//! Per-owner reader/writer locks guarding an owner's chunks and vector
//! index artifact within one process.
//!
//! Adds, reindexes and rebuilds take the owner's write lock for their whole
//! write + build + persist sequence; searches take the read lock while
//! loading. Owners never contend with each other.
//!
//! Only owners with a lock in use keep an entry, so the map stays bounded
//! by the number of concurrently active owners.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::RwLock;

#[derive(Default)]
pub struct OwnerLocks {
    inner: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl OwnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `owner`, created on first use. The map mutex is
    /// released before the caller awaits the returned lock.
    ///
    /// Entries nobody else holds are dropped first. A holder or waiter
    /// always owns a clone of the `Arc`, so a pruned lock is never in use.
    pub fn for_owner(&self, owner: &str) -> Arc<RwLock<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.retain(|_, lock| Arc::strong_count(lock) > 1);
        map.entry(owner.to_string()).or_default().clone()
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
