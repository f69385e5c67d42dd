//! State tracking module
//!
//! This module contains the per-crawl bookkeeping: the state machine each URL
//! moves through, the ledger holding visited URLs and failures, and the tracker
//! that knows when all recursively spawned work has finished.

mod ledger;
mod page_state;
mod tracker;

pub use ledger::CrawlLedger;
pub use page_state::PageState;
pub use tracker::{CompletionTracker, WorkUnit};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, recovering the data if a panicking task poisoned it
///
/// Every critical section in the crate leaves its data consistent before any
/// call that could panic, so the inner value is still valid after a poison.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
