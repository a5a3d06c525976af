//! Background refresh bookkeeping.
//!
//! Cache-First hits return immediately and re-fetch the resource on a spawned
//! task. Each task is owned by a [`RefreshTracker`] so a caller can wait for
//! every outstanding refresh (tests, shutdown), and each spawn hands back a
//! [`RefreshHandle`] for observing that one outcome.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tokio::task::JoinSet;

/// Result of one background refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The stored entry was replaced with a fresh 200.
    Updated,
    /// The stored entry was left untouched.
    Unchanged(String),
    /// The task ended without reporting (panicked or was aborted).
    Abandoned,
}

impl RefreshOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, RefreshOutcome::Updated)
    }
}

/// Observer for a single spawned refresh.
#[derive(Debug)]
pub struct RefreshHandle {
    rx: oneshot::Receiver<RefreshOutcome>,
}

impl RefreshHandle {
    /// Wait for the refresh to finish.
    pub async fn wait(self) -> RefreshOutcome {
        self.rx.await.unwrap_or(RefreshOutcome::Abandoned)
    }
}

/// Owns every background refresh task. Clones share the same task set.
#[derive(Clone, Default)]
pub struct RefreshTracker {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl RefreshTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` on the current runtime.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, task: F) -> RefreshHandle
    where
        F: Future<Output = RefreshOutcome> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let mut tasks = self.lock();
        // reap finished tasks so the set only holds live ones
        while let Some(result) = tasks.try_join_next() {
            if let Err(e) = result {
                warn!("Background refresh ended abnormally: {}", e);
            }
        }
        tasks.spawn(async move {
            let outcome = task.await;
            let _ = tx.send(outcome);
        });
        RefreshHandle { rx }
    }

    /// Number of refreshes not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    /// Wait until every refresh spawned so far, and any spawned while
    /// waiting, has finished.
    pub async fn wait_idle(&self) {
        loop {
            let mut tasks = std::mem::take(&mut *self.lock());
            if tasks.is_empty() {
                return;
            }
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    warn!("Background refresh ended abnormally: {}", e);
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        // a panic while holding the guard leaves the set itself consistent
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
