//! Per-crawl state
//!
//! Everything a single `download` call mutates lives here and is scoped to one
//! [`CrawlSession`]; nothing is shared between concurrent crawls.

mod host_queue;
mod pending;
mod session;

pub use host_queue::{CrawlTask, HostPermit, HostQueue};
pub use pending::{PendingCounter, PendingGuard};
pub use session::{CrawlResult, CrawlSession};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, recovering the data if a panicking task poisoned it
///
/// Every critical section in this crate leaves its data consistent before any
/// call that can panic, so the inner value is still valid after a poison.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
