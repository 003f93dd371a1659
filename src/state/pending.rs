//! Pending-work counter used for crawl completion detection
//!
//! A wait group: one unit per task that has been handed to a pool and has not
//! finished yet. The coordinator waits for the count to drop to zero.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Counts outstanding tasks and wakes waiters when the count reaches zero
#[derive(Debug, Default)]
pub struct PendingCounter {
    count: AtomicUsize,
    idle: Notify,
}

impl PendingCounter {
    /// Creates a counter with no outstanding work
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one unit of outstanding work
    ///
    /// Must be called before the task is submitted. The unit is released when
    /// the returned guard is dropped, which happens after the task body ends or
    /// when a refused submission drops the task.
    pub fn enter(self: &Arc<Self>) -> PendingGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        PendingGuard {
            counter: Arc::clone(self),
        }
    }

    /// Returns the number of outstanding units
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Returns whether no work is outstanding
    pub fn is_idle(&self) -> bool {
        self.count() == 0
    }

    /// Waits until the count is zero
    pub async fn wait_idle(&self) {
        loop {
            // Registered before the check so a concurrent notify_waiters is not missed.
            let notified = self.idle.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    fn leave(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// One unit of outstanding work; releases it on drop
#[derive(Debug)]
#[must_use = "dropping the guard immediately releases the pending unit"]
pub struct PendingGuard {
    counter: Arc<PendingCounter>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.counter.leave();
    }
}
