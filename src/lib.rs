//! Parcrawl: a recursive web crawler with bounded concurrency
//!
//! This crate walks the link graph reachable from a seed URL up to a depth bound.
//! Every URL is fetched at most once per crawl, fetches are limited both globally
//! and per host, and link extraction runs on its own bounded pool so the two
//! kinds of work can never starve each other.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for setting up and driving a crawler
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("No Tokio runtime available: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Failure to fetch a single URL
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Could not connect to {url}")]
    Unreachable { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to extract links from a fetched document
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid base URL {url}: {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: ::url::ParseError,
    },

    #[error("Extraction of {url} panicked: {message}")]
    Panicked { url: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Worker pool errors
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("The {pool} pool is shut down")]
    Closed { pool: &'static str },

    #[error("The {pool} pool did not drain within {timeout:?}; remaining jobs were aborted")]
    DrainTimeout {
        pool: &'static str,
        timeout: std::time::Duration,
    },
}

/// Which half of a URL's processing a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Fetch,
    Extract,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch => f.write_str("fetch"),
            Self::Extract => f.write_str("extraction"),
        }
    }
}

/// A per-URL failure recorded during a crawl
#[derive(Debug, Error)]
pub enum CrawlFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("Crawler shut down before {stage} of {url} finished")]
    Cancelled { url: String, stage: Stage },

    #[error("Task panicked during {stage} of {url}")]
    Panicked { url: String, stage: Stage },
}

impl CrawlFailure {
    /// Returns the stage this failure happened in
    pub fn stage(&self) -> Stage {
        match self {
            Self::Fetch(_) => Stage::Fetch,
            Self::Extract(_) => Stage::Extract,
            Self::Cancelled { stage, .. } | Self::Panicked { stage, .. } => *stage,
        }
    }

    /// Returns true if the failure was caused by crawler shutdown
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Result type alias for crawler setup operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlResult, Document, Downloader, HtmlDocument, HttpDownloader, WebCrawler};
pub use state::PageState;
pub use url::{host_of, normalize_url};
