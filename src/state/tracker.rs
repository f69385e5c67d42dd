//! Outstanding-work accounting for one crawl
//!
//! Every asynchronous unit of work (one fetch, one extraction) is represented
//! by a [`WorkUnit`] obtained from [`CompletionTracker::register`] before the
//! unit is handed to a pool. Dropping the unit marks it finished, so a task
//! arrives exactly once whether it succeeds, fails, panics or is cancelled.
//!
//! A unit that spawns continuations must register them before it is dropped;
//! the count then never touches zero while more work is still on its way.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct TrackerInner {
    outstanding: AtomicUsize,
    idle: Notify,
}

/// Counts outstanding work and wakes waiters when it drains to zero
#[derive(Debug, Clone, Default)]
pub struct CompletionTracker {
    inner: Arc<TrackerInner>,
}

impl CompletionTracker {
    /// Creates a tracker with no outstanding work
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one new unit of work
    ///
    /// Call this before the work is submitted anywhere.
    pub fn register(&self) -> WorkUnit {
        self.inner.outstanding.fetch_add(1, Ordering::AcqRel);
        WorkUnit {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Returns the number of units registered but not yet finished
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    /// Waits until every registered unit has finished
    ///
    /// Returns immediately if nothing is outstanding.
    pub async fn wait_idle(&self) {
        loop {
            // Created before the check so a concurrent final arrival is not missed
            let idle = self.inner.idle.notified();
            if self.outstanding() == 0 {
                return;
            }
            idle.await;
        }
    }
}

/// One registered unit of outstanding work
///
/// The unit arrives when dropped.
#[must_use = "dropping a WorkUnit immediately marks its work as finished"]
#[derive(Debug)]
pub struct WorkUnit {
    inner: Arc<TrackerInner>,
}

impl WorkUnit {
    /// Marks this unit as finished
    pub fn arrive(self) {}
}

impl Drop for WorkUnit {
    fn drop(&mut self) {
        if self.inner.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}
