//! Integration tests for the crawl engine
//!
//! These tests drive `WebCrawler` over an in-memory link graph. The graph
//! downloader records how often each URL was fetched and how many fetches
//! were in flight at once, globally and per host.

use parcrawl::config::CrawlerConfig;
use parcrawl::{
    host_of, CrawlFailure, CrawlResult, Document, Downloader, ExtractError, FetchError, WebCrawler,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A link graph with per-URL behaviour
#[derive(Default)]
struct Graph {
    links: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    broken: HashSet<String>,
    hanging: HashSet<String>,
    delay: Duration,
}

impl Graph {
    fn link(mut self, from: &str, to: &[&str]) -> Self {
        self.links
            .insert(from.to_string(), to.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Fetching this URL fails
    fn fail(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    /// Extracting links from this URL fails
    fn broken(mut self, url: &str) -> Self {
        self.broken.insert(url.to_string());
        self
    }

    /// Fetching this URL never completes
    fn hang(mut self, url: &str) -> Self {
        self.hanging.insert(url.to_string());
        self
    }

    fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

struct GraphDownloader {
    graph: Graph,
    fetches: Mutex<HashMap<String, usize>>,
    per_host: Mutex<HashMap<String, usize>>,
    peak_per_host: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    extractions: Arc<AtomicUsize>,
}

impl GraphDownloader {
    fn new(graph: Graph) -> Self {
        Self {
            graph,
            fetches: Mutex::new(HashMap::new()),
            per_host: Mutex::new(HashMap::new()),
            peak_per_host: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            extractions: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn fetch_count(&self, url: &str) -> usize {
        self.fetches.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn fetch_counts(&self) -> HashMap<String, usize> {
        self.fetches.lock().unwrap().clone()
    }

    fn enter(&self, host: &str) -> InFlight<'_> {
        let on_host = {
            let mut per_host = self.per_host.lock().unwrap();
            let count = per_host.entry(host.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        self.peak_per_host.fetch_max(on_host, Ordering::SeqCst);

        let total = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(total, Ordering::SeqCst);

        InFlight {
            downloader: self,
            host: host.to_string(),
        }
    }
}

/// Counts one fetch as in flight until dropped
struct InFlight<'a> {
    downloader: &'a GraphDownloader,
    host: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(count) = self.downloader.per_host.lock().unwrap().get_mut(&self.host) {
            *count -= 1;
        }
        self.downloader.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

struct GraphDocument {
    links: Vec<String>,
    broken: bool,
    extractions: Arc<AtomicUsize>,
}

impl Document for GraphDocument {
    fn extract_links(self) -> Result<Vec<String>, ExtractError> {
        self.extractions.fetch_add(1, Ordering::SeqCst);
        if self.broken {
            return Err(ExtractError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "corrupt page",
            )));
        }
        Ok(self.links)
    }
}

impl Downloader for GraphDownloader {
    type Document = GraphDocument;

    async fn download(&self, url: &str) -> Result<GraphDocument, FetchError> {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_insert(0) += 1;

        let host = host_of(url).expect("crawler only fetches URLs with a host");
        let _in_flight = self.enter(&host);

        if self.graph.hanging.contains(url) {
            std::future::pending::<()>().await;
        }
        if !self.graph.delay.is_zero() {
            tokio::time::sleep(self.graph.delay).await;
        }

        if self.graph.failing.contains(url) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 500,
            });
        }

        Ok(GraphDocument {
            links: self.graph.links.get(url).cloned().unwrap_or_default(),
            broken: self.graph.broken.contains(url),
            extractions: Arc::clone(&self.extractions),
        })
    }
}

fn create_test_config(downloaders: usize, extractors: usize, per_host: usize) -> CrawlerConfig {
    CrawlerConfig {
        downloaders,
        extractors,
        per_host,
        shutdown_timeout_ms: 200,
    }
}

fn crawler(graph: Graph, config: CrawlerConfig) -> WebCrawler<GraphDownloader> {
    WebCrawler::new(GraphDownloader::new(graph), &config).expect("Failed to create crawler")
}

async fn crawl(crawler: &WebCrawler<GraphDownloader>, seed: &str, depth: u32) -> CrawlResult {
    tokio::time::timeout(Duration::from_secs(10), crawler.download(seed, depth))
        .await
        .expect("crawl did not terminate")
}

fn urls(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn error_urls(result: &CrawlResult) -> BTreeSet<String> {
    result.errors.keys().cloned().collect()
}

const A: &str = "http://a.test/";
const B: &str = "http://b.test/";
const C: &str = "http://c.test/";
const D: &str = "http://d.test/";

fn scenario_graph() -> Graph {
    Graph::default()
        .link(A, &[B, C])
        .link(B, &[D])
        .link(C, &[A])
        .fail(C)
}

#[tokio::test]
async fn test_scenario_reaches_grandchild_at_depth_three() {
    let crawler = crawler(scenario_graph(), create_test_config(5, 5, 20));
    let result = crawl(&crawler, A, 3).await;

    assert_eq!(result.downloaded, urls(&[A, B, D]));
    assert_eq!(error_urls(&result), urls(&[C]));
    assert!(matches!(
        result.error(C),
        Some(CrawlFailure::Fetch(FetchError::Status { status: 500, .. }))
    ));

    crawler.close().await;
}

#[tokio::test]
async fn test_scenario_stops_at_children_at_depth_two() {
    let crawler = crawler(scenario_graph(), create_test_config(5, 5, 20));
    let result = crawl(&crawler, A, 2).await;

    assert_eq!(result.downloaded, urls(&[A, B]));
    assert_eq!(error_urls(&result), urls(&[C]));
    assert_eq!(crawler.downloader().fetch_count(D), 0);

    crawler.close().await;
}

#[tokio::test]
async fn test_cycle_fetches_each_page_once() {
    let graph = Graph::default().link(A, &[B]).link(B, &[A]);
    let crawler = crawler(graph, create_test_config(5, 5, 20));
    let result = crawl(&crawler, A, 3).await;

    assert_eq!(result.downloaded, urls(&[A, B]));
    assert!(result.errors.is_empty());
    assert_eq!(crawler.downloader().fetch_count(A), 1);
    assert_eq!(crawler.downloader().fetch_count(B), 1);

    crawler.close().await;
}

#[tokio::test]
async fn test_depth_one_fetches_only_the_seed() {
    let crawler = crawler(scenario_graph(), create_test_config(5, 5, 20));
    let result = crawl(&crawler, A, 1).await;

    assert_eq!(result.downloaded, urls(&[A]));
    assert!(result.errors.is_empty());
    assert_eq!(crawler.downloader().extractions.load(Ordering::SeqCst), 0);
    assert_eq!(crawler.downloader().fetch_count(B), 0);

    crawler.close().await;
}

#[tokio::test]
async fn test_depth_zero_fetches_nothing() {
    let crawler = crawler(scenario_graph(), create_test_config(5, 5, 20));
    let result = crawl(&crawler, A, 0).await;

    assert!(result.is_empty());
    assert!(crawler.downloader().fetch_counts().is_empty());

    crawler.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_per_host_limit_of_one() {
    let seed = "http://same.test/";
    let pages: Vec<String> = (0..10).map(|i| format!("http://same.test/{}", i)).collect();
    let page_refs: Vec<&str> = pages.iter().map(String::as_str).collect();

    let graph = Graph::default()
        .link(seed, &page_refs)
        .delay(Duration::from_millis(10));
    let crawler = crawler(graph, create_test_config(8, 4, 1));
    let result = crawl(&crawler, seed, 2).await;

    assert_eq!(result.downloaded.len(), 11);
    assert!(result.errors.is_empty());
    assert_eq!(crawler.downloader().peak_per_host.load(Ordering::SeqCst), 1);

    crawler.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_global_limit_across_hosts() {
    let seed = "http://hub.test/";
    let pages: Vec<String> = (0..20).map(|i| format!("http://host{}.test/", i)).collect();
    let page_refs: Vec<&str> = pages.iter().map(String::as_str).collect();

    let graph = Graph::default()
        .link(seed, &page_refs)
        .delay(Duration::from_millis(10));
    let crawler = crawler(graph, create_test_config(3, 2, 20));
    let result = crawl(&crawler, seed, 2).await;

    assert_eq!(result.downloaded.len(), 21);
    assert!(crawler.downloader().peak_in_flight.load(Ordering::SeqCst) <= 3);

    crawler.close().await;
}

/// A graph dense with shared links and back edges across a handful of hosts
fn mesh_graph() -> Graph {
    let url = |i: usize| format!("http://h{}.test/p{}", i % 4, i);
    let mut graph = Graph::default().delay(Duration::from_millis(1));

    for i in 0..40 {
        let targets = [url((i * 7 + 3) % 40), url((i * 13 + 5) % 40), url((i + 1) % 40)];
        let targets: Vec<&str> = targets.iter().map(String::as_str).collect();
        graph = graph.link(&url(i), &targets);
    }
    for i in [5, 17, 23] {
        graph = graph.fail(&url(i));
    }
    graph.broken(&url(11))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_worker_count_does_not_change_result() {
    let seed = "http://h0.test/p0";

    // The first path to claim a page fixes the depth it is expanded at, so under a
    // tight depth bound the result depends on scheduling. A depth past the page
    // count expands every claimed page and makes the result deterministic.
    let depth = 50;

    let serial = crawler(mesh_graph(), create_test_config(1, 1, 1));
    let serial_result = crawl(&serial, seed, depth).await;

    let parallel = crawler(mesh_graph(), create_test_config(8, 4, 3));
    let parallel_result = crawl(&parallel, seed, depth).await;

    assert_eq!(serial_result.downloaded, parallel_result.downloaded);
    assert_eq!(error_urls(&serial_result), error_urls(&parallel_result));
    assert!(serial_result
        .downloaded
        .is_disjoint(&error_urls(&serial_result)));

    for counts in [
        serial.downloader().fetch_counts(),
        parallel.downloader().fetch_counts(),
    ] {
        assert!(counts.values().all(|&n| n == 1), "{:?}", counts);
    }

    serial.close().await;
    parallel.close().await;
}

#[tokio::test]
async fn test_all_fetches_failing_still_terminates() {
    let graph = Graph::default().fail(A);
    let crawler = crawler(graph, create_test_config(2, 2, 2));
    let result = crawl(&crawler, A, 5).await;

    assert!(result.downloaded.is_empty());
    assert_eq!(error_urls(&result), urls(&[A]));

    crawler.close().await;
}

#[tokio::test]
async fn test_malformed_children_are_dropped() {
    let graph = Graph::default().link(A, &["not a url", "http://", "mailto:someone@a.test", B]);
    let crawler = crawler(graph, create_test_config(2, 2, 2));
    let result = crawl(&crawler, A, 2).await;

    assert_eq!(result.downloaded, urls(&[A, B]));
    assert!(result.errors.is_empty());
    assert_eq!(crawler.downloader().fetch_counts().len(), 2);

    crawler.close().await;
}

#[tokio::test]
async fn test_extraction_failure_is_recorded_under_parent() {
    let graph = Graph::default().link(A, &[B]).broken(A);
    let crawler = crawler(graph, create_test_config(2, 2, 2));
    let result = crawl(&crawler, A, 3).await;

    assert!(result.downloaded.is_empty());
    assert!(matches!(result.error(A), Some(CrawlFailure::Extract(_))));
    assert_eq!(crawler.downloader().fetch_count(B), 0);

    crawler.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_close_cancels_hanging_fetches() {
    let slow = "http://a.test/slow";
    let queued = "http://a.test/queued";
    let graph = Graph::default().link(A, &[slow, queued]).hang(slow);
    let crawler = Arc::new(crawler(graph, create_test_config(2, 2, 1)));

    let download = tokio::spawn({
        let crawler = Arc::clone(&crawler);
        async move { crawler.download(A, 2).await }
    });

    tokio::time::timeout(Duration::from_secs(5), async {
        while crawler.downloader().fetch_count(slow) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("hanging fetch never started");

    crawler.close().await;
    assert!(crawler.is_closed());

    let result = tokio::time::timeout(Duration::from_secs(5), download)
        .await
        .expect("download did not return after close")
        .expect("download task panicked");

    assert_eq!(result.downloaded, urls(&[A]));
    assert_eq!(
        result.cancelled().collect::<BTreeSet<_>>(),
        [slow, queued].into_iter().collect()
    );
    assert_eq!(crawler.downloader().fetch_count(queued), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_downloads_are_independent() {
    let graph = Graph::default()
        .link(A, &[B])
        .link(C, &[B, D])
        .delay(Duration::from_millis(5));
    let crawler = crawler(graph, create_test_config(4, 2, 2));

    let (first, second) = tokio::join!(crawl(&crawler, A, 2), crawl(&crawler, C, 2));

    assert_eq!(first.downloaded, urls(&[A, B]));
    assert_eq!(second.downloaded, urls(&[B, C, D]));
    // Each call has its own visited set
    assert_eq!(crawler.downloader().fetch_count(B), 2);

    crawler.close().await;
}

#[tokio::test]
async fn test_crawler_is_reusable_across_calls() {
    let crawler = crawler(scenario_graph(), create_test_config(2, 2, 2));

    let first = crawl(&crawler, A, 2).await;
    let second = crawl(&crawler, A, 2).await;

    assert_eq!(first.downloaded, second.downloaded);
    assert_eq!(error_urls(&first), error_urls(&second));
    assert_eq!(crawler.downloader().fetch_count(A), 2);

    crawler.close().await;
}
