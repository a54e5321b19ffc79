//! Per-stream serialization of read-modify-write commands.
//!
//! Optimistic version checks in the store already reject lost updates. These
//! locks keep concurrent commands in one process from tripping over each other
//! so that, for example, two payments recorded at once against the same order
//! both land and the second one sees the first.
//!
//! Callers acquire streams in a fixed hierarchy: payment, then order, then
//! client, then the order-number sequence. Every command follows it, so no
//! two commands can wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use common::AggregateId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Entries are pruned once the map grows past this many idle streams.
const PRUNE_THRESHOLD: usize = 1024;

/// Registry of async mutexes keyed by stream id.
#[derive(Clone, Default)]
pub struct StreamLocks {
    inner: Arc<Mutex<HashMap<AggregateId, Arc<AsyncMutex<()>>>>>,
}

/// Holds the locks for a set of streams until dropped.
#[must_use = "stream locks are released when the guard is dropped"]
pub struct StreamGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl StreamLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks `ids` in the order given. Duplicate ids are locked once.
    pub async fn acquire(&self, ids: &[AggregateId]) -> StreamGuard {
        let mut guards = Vec::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            if ids[..i].contains(id) {
                continue;
            }
            let mutex = self.mutex_for(*id);
            guards.push(mutex.lock_owned().await);
        }
        StreamGuard { _guards: guards }
    }

    fn mutex_for(&self, id: AggregateId) -> Arc<AsyncMutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if map.len() > PRUNE_THRESHOLD {
            map.retain(|_, m| Arc::strong_count(m) > 1);
        }
        map.entry(id).or_default().clone()
    }

    /// Number of streams currently tracked.
    pub fn tracked(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
