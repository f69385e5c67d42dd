//! Fixed-size worker pools
//!
//! A pool is a set of Tokio tasks draining one shared unbounded job channel.
//! Submitting never blocks. Shutting down closes the channel, lets the workers
//! drain what is already queued, and aborts them once the drain timeout passes.

use crate::state::lock;
use crate::PoolError;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// A unit of work run by a pool worker
pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

type SharedQueue = Arc<tokio::sync::Mutex<UnboundedReceiver<Job>>>;

/// A named, fixed-size pool of Tokio worker tasks
pub struct WorkerPool {
    name: &'static str,
    size: usize,
    sender: Mutex<Option<UnboundedSender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawns `size` workers on the current Tokio runtime
    ///
    /// A size of zero is raised to one.
    pub fn new(name: &'static str, size: usize) -> Result<Self, tokio::runtime::TryCurrentError> {
        let handle = Handle::try_current()?;
        let size = size.max(1);

        let (sender, receiver) = mpsc::unbounded_channel();
        let queue: SharedQueue = Arc::new(tokio::sync::Mutex::new(receiver));

        let workers = (0..size)
            .map(|id| handle.spawn(worker_loop(name, id, Arc::clone(&queue))))
            .collect();

        tracing::debug!("Started {} pool with {} workers", name, size);

        Ok(Self {
            name,
            size,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        })
    }

    /// Queues a job for execution
    ///
    /// After shutdown the job is dropped without being polled and
    /// `PoolError::Closed` is returned.
    pub fn submit<F>(&self, job: F) -> Result<(), PoolError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let job: Job = Box::pin(job);

        let rejected = {
            let sender = lock(&self.sender);
            match sender.as_ref() {
                Some(sender) => sender.send(job).err().map(|returned| returned.0),
                None => Some(job),
            }
        };

        // Dropping a job can run guards that submit more work, so the sender
        // lock must already be released here
        match rejected {
            None => Ok(()),
            Some(job) => {
                drop(job);
                Err(PoolError::Closed { pool: self.name })
            }
        }
    }

    /// Returns true once shutdown has started
    pub fn is_closed(&self) -> bool {
        lock(&self.sender).is_none()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Stops accepting jobs and waits for the queued ones to finish
    ///
    /// Workers still busy after `timeout` are aborted, which drops their
    /// current job and everything left in the queue. Calling this again after
    /// the first call returns `Ok(())` immediately.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), PoolError> {
        let sender = lock(&self.sender).take();
        let workers = std::mem::take(&mut *lock(&self.workers));

        if sender.is_none() && workers.is_empty() {
            return Ok(());
        }
        drop(sender);

        let aborts: Vec<_> = workers.iter().map(JoinHandle::abort_handle).collect();
        let drained = futures::future::join_all(workers);
        tokio::pin!(drained);

        match tokio::time::timeout(timeout, &mut drained).await {
            Ok(_) => {
                tracing::debug!("{} pool drained", self.name);
                Ok(())
            }
            Err(_) => {
                for abort in &aborts {
                    abort.abort();
                }
                // Wait for the aborted workers so their jobs are dropped before returning
                drained.await;
                Err(PoolError::DrainTimeout {
                    pool: self.name,
                    timeout,
                })
            }
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn worker_loop(pool: &'static str, id: usize, queue: SharedQueue) {
    loop {
        let job = { queue.lock().await.recv().await };
        let Some(job) = job else {
            break;
        };

        if let Err(payload) = AssertUnwindSafe(job).catch_unwind().await {
            tracing::error!(
                "{} worker {} recovered from a panicking job: {}",
                pool,
                id,
                panic_message(payload.as_ref())
            );
        }
    }

    tracing::trace!("{} worker {} stopped", pool, id);
}

/// Renders a panic payload for logs and error values
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
