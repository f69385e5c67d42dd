//! Crawler coordinator - the public entry point of the crawl engine
//!
//! The coordinator owns the two worker pools for its whole lifetime and hands
//! them to a fresh session on every `download` call:
//! - the fetch pool runs downloads, gated per host
//! - the extract pool runs link extraction
//!
//! Keeping the pools separate means fetches waiting on extraction (or the other
//! way round) can never take up every worker.

use crate::config::{Config, CrawlerConfig};
use crate::crawler::pool::WorkerPool;
use crate::crawler::session::Session;
use crate::crawler::{CrawlResult, Downloader, HttpDownloader};
use crate::CrawlerError;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Recursive web crawler with bounded concurrency
///
/// `download` may be called many times, one after another or concurrently;
/// each call has its own visited set and results. Call [`WebCrawler::close`]
/// when done to stop the workers.
///
/// # Example
///
/// ```no_run
/// use parcrawl::{Config, WebCrawler};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let crawler = WebCrawler::from_config(&Config::default())?;
/// let result = crawler.download("https://example.com/", 2).await;
/// println!("{} pages downloaded", result.downloaded.len());
/// crawler.close().await;
/// # Ok(())
/// # }
/// ```
pub struct WebCrawler<D: Downloader> {
    downloader: Arc<D>,
    fetch_pool: Arc<WorkerPool>,
    extract_pool: Arc<WorkerPool>,
    per_host: usize,
    shutdown_timeout: Duration,
}

impl<D: Downloader> WebCrawler<D> {
    /// Creates a crawler and starts its worker pools
    ///
    /// # Arguments
    ///
    /// * `downloader` - Fetches the content of each URL
    /// * `config` - Pool sizes, per-host limit and shutdown timeout
    ///
    /// # Returns
    ///
    /// * `Ok(WebCrawler)` - Workers are running
    /// * `Err(CrawlerError::Runtime)` - Called outside a Tokio runtime
    pub fn new(downloader: D, config: &CrawlerConfig) -> Result<Self, CrawlerError> {
        let fetch_pool = Arc::new(WorkerPool::new("fetch", config.downloaders)?);
        let extract_pool = Arc::new(WorkerPool::new("extract", config.extractors)?);

        tracing::info!(
            "Crawler ready: {} downloaders, {} extractors, {} per host",
            fetch_pool.size(),
            extract_pool.size(),
            config.per_host
        );

        Ok(Self {
            downloader: Arc::new(downloader),
            fetch_pool,
            extract_pool,
            per_host: config.per_host.max(1),
            shutdown_timeout: config.shutdown_timeout(),
        })
    }

    /// Crawls every page reachable from `url` within `depth` levels
    ///
    /// Depth 1 fetches only `url`; each further level follows the links of the
    /// previous one. Depth 0 returns an empty result without fetching. Resolves
    /// once every fetch and extraction of this call has finished.
    pub async fn download(&self, url: &str, depth: u32) -> CrawlResult {
        if depth == 0 {
            return CrawlResult::default();
        }

        tracing::info!("Starting crawl of {} with depth {}", url, depth);
        let start_time = Instant::now();

        let session = Arc::new(Session::new(
            Arc::clone(&self.downloader),
            Arc::clone(&self.fetch_pool),
            Arc::clone(&self.extract_pool),
            self.per_host,
        ));
        let result = session.run(url, depth).await;

        tracing::info!(
            "Crawl of {} completed: {} downloaded, {} failed in {:?}",
            url,
            result.downloaded.len(),
            result.errors.len(),
            start_time.elapsed()
        );

        result
    }

    /// Stops both pools
    ///
    /// Queued work gets up to the configured shutdown timeout to finish; what
    /// is still running after that is aborted and reported as cancelled to any
    /// `download` call in progress. Calling this more than once is harmless.
    pub async fn close(&self) {
        let (fetch, extract) = tokio::join!(
            self.fetch_pool.shutdown(self.shutdown_timeout),
            self.extract_pool.shutdown(self.shutdown_timeout)
        );

        for outcome in [fetch, extract] {
            if let Err(e) = outcome {
                tracing::warn!("{}", e);
            }
        }

        tracing::info!("Crawler closed");
    }

    /// Returns true once `close` has been called
    pub fn is_closed(&self) -> bool {
        self.fetch_pool.is_closed() && self.extract_pool.is_closed()
    }

    pub fn downloader(&self) -> &D {
        &self.downloader
    }
}

impl WebCrawler<HttpDownloader> {
    /// Builds an HTTP crawler from configuration
    pub fn from_config(config: &Config) -> Result<Self, CrawlerError> {
        let downloader = HttpDownloader::new(config)?;
        Self::new(downloader, &config.crawler)
    }
}
