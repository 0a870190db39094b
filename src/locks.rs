// src/locks.rs
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::AssetId;

/// One async mutex per asset id.
///
/// Holding the guard for an id serializes every mint and transfer on that
/// id. Guards for different ids are independent, so unrelated assets never
/// wait on each other.
#[derive(Default)]
pub struct AssetLocks {
    locks: DashMap<AssetId, Arc<Mutex<()>>>,
}

impl AssetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`.
    ///
    /// Dropping the returned future before it resolves (caller gave up)
    /// leaves the lock untouched.
    pub async fn acquire(&self, id: &str) -> OwnedMutexGuard<()> {
        // The shard guard must be gone before the await below.
        let lock = Arc::clone(
            self.locks
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );

        lock.lock_owned().await
    }

    /// Number of ids that have ever been locked.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
