//! Per-host admission control
//!
//! Each host seen during a crawl gets one gate. The gate keeps at most `limit`
//! of that host's fetches on the fetch pool and parks the rest in a FIFO
//! queue. Admission never waits: a parked fetch is handed to the pool by
//! whichever fetch on the same host finishes first.

use crate::crawler::pool::{Job, WorkerPool};
use crate::state::lock;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct GateState {
    active: usize,
    queue: VecDeque<Job>,
}

/// Limits concurrent fetches to one host
pub struct HostGate {
    host: String,
    limit: usize,
    pool: Arc<WorkerPool>,
    state: Mutex<GateState>,
}

impl HostGate {
    pub fn new(host: impl Into<String>, limit: usize, pool: Arc<WorkerPool>) -> Arc<Self> {
        Arc::new(Self {
            host: host.into(),
            limit: limit.max(1),
            pool,
            state: Mutex::new(GateState::default()),
        })
    }

    /// Queues a fetch behind this host's limit
    ///
    /// The task reaches the pool exactly once unless the pool shuts down
    /// first, in which case it is dropped without being polled.
    pub fn submit<F>(self: &Arc<Self>, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        lock(&self.state).queue.push_back(Box::pin(task));
        self.dispatch();
    }

    /// Number of this host's fetches currently on the pool
    pub fn active(&self) -> usize {
        lock(&self.state).active
    }

    /// Number of this host's fetches waiting for a slot
    pub fn queued(&self) -> usize {
        lock(&self.state).queue.len()
    }

    /// Moves queued tasks to the pool while slots are free
    fn dispatch(self: &Arc<Self>) {
        loop {
            let next = {
                let mut state = lock(&self.state);
                if state.active >= self.limit {
                    return;
                }
                match state.queue.pop_front() {
                    Some(task) => {
                        state.active += 1;
                        task
                    }
                    None => return,
                }
            };

            let slot = HostSlot {
                gate: Arc::clone(self),
            };
            let admitted = async move {
                let _slot = slot;
                next.await;
            };

            // A rejected task releases its slot on drop, which empties the queue
            if self.pool.submit(admitted).is_err() {
                return;
            }
        }
    }

    fn release(self: &Arc<Self>) {
        {
            let mut state = lock(&self.state);
            state.active = state.active.saturating_sub(1);
        }

        if self.pool.is_closed() {
            self.cancel_queued();
        } else {
            self.dispatch();
        }
    }

    /// Drops every parked task once the pool can no longer run them
    fn cancel_queued(&self) {
        let parked: Vec<Job> = lock(&self.state).queue.drain(..).collect();
        if !parked.is_empty() {
            tracing::debug!(
                "Dropping {} queued fetches for {} after pool shutdown",
                parked.len(),
                self.host
            );
        }
        drop(parked);
    }
}

impl std::fmt::Debug for HostGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("HostGate")
            .field("host", &self.host)
            .field("limit", &self.limit)
            .field("active", &state.active)
            .field("queued", &state.queue.len())
            .finish()
    }
}

/// Holds one of the gate's slots; frees it on drop
struct HostSlot {
    gate: Arc<HostGate>,
}

impl Drop for HostSlot {
    fn drop(&mut self) {
        self.gate.release();
    }
}
