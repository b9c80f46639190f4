//! In-process serialisation of conflicting operations.
//!
//! These locks only order callers within one process. Cross-process
//! safety comes from the guarded database transactions.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// One async mutex per key, created on demand and dropped again once
/// nobody holds or waits for it.
#[derive(Clone, Default)]
pub struct KeyedLocks {
    entries: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: Uuid) -> KeyedGuard {
        let mutex = self
            .entries
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        KeyedGuard {
            key,
            entries: Arc::clone(&self.entries),
            guard: Some(guard),
        }
    }

    /// Number of keys currently locked or awaited.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Held for the duration of a keyed critical section.
pub struct KeyedGuard {
    key: Uuid,
    entries: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        // Release first so the map holds the last reference when idle.
        self.guard.take();
        self.entries
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

/// Single lock around every change to the member roster (removal,
/// deactivation, role and active-flag updates).
#[derive(Clone, Default)]
pub struct RosterLock {
    inner: Arc<Mutex<()>>,
}

impl RosterLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.inner).lock_owned().await
    }
}
