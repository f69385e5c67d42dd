//! Crawler module for concurrent link-graph traversal
//!
//! This module contains the core crawling logic, including:
//! - Fixed-size worker pools for fetching and for link extraction
//! - Per-host admission gates
//! - The per-call crawl session and its state machine
//! - HTTP fetching and HTML link extraction
//! - The `WebCrawler` entry point

mod coordinator;
mod fetcher;
mod host_gate;
mod parser;
mod pool;
mod result;
mod session;
mod traits;

pub use coordinator::WebCrawler;
pub use fetcher::{build_http_client, HttpDownloader};
pub use host_gate::HostGate;
pub use parser::{parse_links, HtmlDocument};
pub use pool::{Job, WorkerPool};
pub use result::CrawlResult;
pub use traits::{Document, Downloader};
