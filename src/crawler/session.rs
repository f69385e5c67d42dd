//! One traversal of the link graph
//!
//! A session owns everything scoped to a single `download` call: the ledger,
//! the host gate table and the completion tracker. The worker pools and the
//! downloader are borrowed from the crawler and shared between sessions.
//!
//! Every fetch and every extraction is wrapped in an [`Attempt`], which holds
//! the work unit for that task. An attempt dropped before it settles records a
//! failure for its URL, so a task that never runs still leaves a trace and
//! still arrives on the tracker.

use crate::crawler::host_gate::HostGate;
use crate::crawler::pool::{panic_message, WorkerPool};
use crate::crawler::{CrawlResult, Document, Downloader};
use crate::state::{lock, CompletionTracker, CrawlLedger, PageState, WorkUnit};
use crate::url::host_of;
use crate::{CrawlFailure, ExtractError, Stage};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub(crate) struct Session<D: Downloader> {
    downloader: Arc<D>,
    fetch_pool: Arc<WorkerPool>,
    extract_pool: Arc<WorkerPool>,
    per_host: usize,
    ledger: Arc<CrawlLedger>,
    hosts: Mutex<HashMap<String, Arc<HostGate>>>,
    tracker: CompletionTracker,
}

impl<D: Downloader> Session<D> {
    pub(crate) fn new(
        downloader: Arc<D>,
        fetch_pool: Arc<WorkerPool>,
        extract_pool: Arc<WorkerPool>,
        per_host: usize,
    ) -> Self {
        Self {
            downloader,
            fetch_pool,
            extract_pool,
            per_host,
            ledger: Arc::new(CrawlLedger::new()),
            hosts: Mutex::new(HashMap::new()),
            tracker: CompletionTracker::new(),
        }
    }

    /// Crawls from `seed` and waits until no work is left
    pub(crate) async fn run(self: Arc<Self>, seed: &str, depth: u32) -> CrawlResult {
        // Held across seeding so the count cannot hit zero before the seed is queued
        let caller = self.tracker.register();
        self.schedule(seed.to_string(), depth);
        caller.arrive();

        self.tracker.wait_idle().await;

        let counts = self.ledger.count_by_state();
        tracing::debug!(
            "Session for {} settled: {} URLs seen across {} hosts, {:?}",
            seed,
            self.ledger.visited(),
            lock(&self.hosts).len(),
            counts
        );

        self.ledger.take_result()
    }

    #[cfg(test)]
    fn outstanding(&self) -> usize {
        self.tracker.outstanding()
    }

    /// Claims `url` and queues its fetch behind the host gate
    ///
    /// Returns without doing anything if the URL was already claimed.
    fn schedule(self: &Arc<Self>, url: String, depth: u32) {
        if depth == 0 {
            return;
        }

        if !self.ledger.claim(&url) {
            tracing::trace!("Skipping already seen {}", url);
            return;
        }

        let host = match host_of(&url) {
            Ok(host) => host,
            Err(e) => {
                tracing::debug!("Dropping {}: {}", url, e);
                self.ledger.mark_invalid(&url);
                return;
            }
        };

        let attempt = self.attempt(url, Stage::Fetch);
        let session = Arc::clone(self);
        self.gate(&host).submit(async move {
            session.fetch(attempt, depth).await;
        });
    }

    fn gate(&self, host: &str) -> Arc<HostGate> {
        let mut hosts = lock(&self.hosts);
        let gate = hosts.entry(host.to_string()).or_insert_with(|| {
            HostGate::new(host, self.per_host, Arc::clone(&self.fetch_pool))
        });
        Arc::clone(gate)
    }

    fn attempt(&self, url: String, stage: Stage) -> Attempt {
        Attempt {
            ledger: Arc::clone(&self.ledger),
            url,
            stage,
            settled: false,
            _unit: self.tracker.register(),
        }
    }

    async fn fetch(self: Arc<Self>, attempt: Attempt, depth: u32) {
        let url = attempt.url.as_str();
        self.ledger.advance(url, PageState::Fetching);
        tracing::debug!("Fetching {} (depth {})", url, depth);

        match self.downloader.download(url).await {
            Ok(document) => {
                self.ledger.advance(url, PageState::Fetched);
                if depth > 1 {
                    self.extract(document, url, depth);
                }
                attempt.settle();
            }
            Err(e) => {
                tracing::debug!("Fetch failed for {}: {}", url, e);
                attempt.fail(CrawlFailure::Fetch(e));
            }
        }
    }

    /// Hands a fetched document to the extraction pool
    fn extract(self: &Arc<Self>, document: D::Document, url: &str, depth: u32) {
        self.ledger.advance(url, PageState::Extracting);

        let attempt = self.attempt(url.to_string(), Stage::Extract);
        let session = Arc::clone(self);
        let submitted = self.extract_pool.submit(async move {
            session.run_extraction(attempt, document, depth).await;
        });

        if let Err(e) = submitted {
            tracing::debug!("Extraction of {} not started: {}", url, e);
        }
    }

    async fn run_extraction(self: Arc<Self>, attempt: Attempt, document: D::Document, depth: u32) {
        let links = match tokio::task::spawn_blocking(move || document.extract_links()).await {
            Ok(links) => links,
            Err(e) if e.is_panic() => Err(ExtractError::Panicked {
                url: attempt.url.clone(),
                message: panic_message(e.into_panic().as_ref()),
            }),
            Err(e) => Err(ExtractError::Panicked {
                url: attempt.url.clone(),
                message: e.to_string(),
            }),
        };

        match links {
            Ok(children) => {
                tracing::debug!("Extracted {} links from {}", children.len(), attempt.url);
                // Children register their own units before this attempt arrives
                for child in children {
                    self.schedule(child, depth - 1);
                }
                self.ledger.advance(&attempt.url, PageState::Extracted);
                attempt.settle();
            }
            Err(e) => {
                tracing::debug!("Extraction failed for {}: {}", attempt.url, e);
                attempt.fail(CrawlFailure::Extract(e));
            }
        }
    }
}

/// One fetch or extraction of one URL
///
/// Owns the task's work unit. Dropping an unsettled attempt records a
/// cancellation (or a panic, while unwinding) before the unit arrives.
struct Attempt {
    ledger: Arc<CrawlLedger>,
    url: String,
    stage: Stage,
    settled: bool,
    _unit: WorkUnit,
}

impl Attempt {
    /// Marks the attempt finished; the caller has already advanced the state
    fn settle(mut self) {
        self.settled = true;
    }

    fn fail(mut self, failure: CrawlFailure) {
        self.ledger.record_failure(&self.url, failure);
        self.settled = true;
    }
}

impl Drop for Attempt {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let url = self.url.clone();
        let failure = if std::thread::panicking() {
            tracing::error!("{} of {} panicked", self.stage, url);
            CrawlFailure::Panicked {
                url,
                stage: self.stage,
            }
        } else {
            tracing::debug!("{} of {} cancelled", self.stage, url);
            CrawlFailure::Cancelled {
                url,
                stage: self.stage,
            }
        };
        self.ledger.record_failure(&self.url, failure);
    }
}
