//! Detached update tasks
//!
//! Reconciliations run outside the request future so a dropped connection or
//! a timeout cannot stop one between the provider write and the local commit.
//! The set is drained at shutdown so the runtime is not torn down under a
//! running reconciliation.

use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tokio::task::JoinSet;

/// Handle to the set of in-flight update tasks
#[derive(Clone, Default)]
pub struct UpdateTasks {
    inner: Arc<Mutex<JoinSet<()>>>,
}

impl UpdateTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fut` as a tracked task and return a receiver for its output
    ///
    /// The task runs to completion even if the receiver is dropped. The
    /// receiver errors only if the task panicked or was aborted.
    pub(crate) fn spawn<F>(&self, fut: F) -> oneshot::Receiver<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let mut set = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        // Reap finished tasks so the set only holds running ones
        while set.try_join_next().is_some() {}

        set.spawn(async move {
            // The caller may be gone; the result is already committed
            let _ = tx.send(fut.await);
        });
        rx
    }

    /// Number of tasks not yet reaped
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait for every task spawned so far to finish
    ///
    /// Returns how many tasks were waited on.
    pub async fn drain(&self) -> usize {
        let mut set = {
            let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };

        let mut drained = 0;
        while let Some(result) = set.join_next().await {
            if let Err(e) = result {
                tracing::error!("Update task failed: {}", e);
            }
            drained += 1;
        }
        drained
    }
}

impl std::fmt::Debug for UpdateTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateTasks")
            .field("in_flight", &self.len())
            .finish()
    }
}
