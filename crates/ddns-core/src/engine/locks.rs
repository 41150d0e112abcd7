//! Per-hostname mutual exclusion
//!
//! Entries are held weakly: once the last guard for a hostname is dropped
//! the mutex is freed, and the dead map slot is pruned on the next insert.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Guard held for the duration of one reconciliation
pub type HostGuard = OwnedMutexGuard<()>;

#[derive(Debug, Default)]
pub struct HostLocks {
    inner: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl HostLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `hostname`
    ///
    /// Callers must pass the normalized hostname so that spellings of the
    /// same name share one lock.
    pub async fn acquire(&self, hostname: &str) -> HostGuard {
        self.slot(hostname).lock_owned().await
    }

    fn slot(&self, hostname: &str) -> Arc<AsyncMutex<()>> {
        // The map is only touched synchronously, so a poisoned lock still
        // holds a consistent map.
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(existing) = map.get(hostname).and_then(Weak::upgrade) {
            return existing;
        }

        map.retain(|_, weak| weak.strong_count() > 0);
        let fresh = Arc::new(AsyncMutex::new(()));
        map.insert(hostname.to_string(), Arc::downgrade(&fresh));
        fresh
    }

    /// Number of live lock entries
    pub fn len(&self) -> usize {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.values().filter(|weak| weak.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
