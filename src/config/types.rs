use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Parcrawl
///
/// Every table is optional; missing tables and keys fall back to 5 downloaders,
/// 5 extractors, 20 fetches per host and one minute to drain on shutdown.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Concurrency limits for the crawl engine
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of fetch workers
    pub downloaders: usize,

    /// Number of link-extraction workers
    pub extractors: usize,

    /// Maximum number of concurrent fetches to a single host
    #[serde(rename = "per-host")]
    pub per_host: usize,

    /// How long each pool may drain on shutdown before it is cancelled (milliseconds)
    #[serde(rename = "shutdown-timeout-ms")]
    pub shutdown_timeout_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            downloaders: 5,
            extractors: 5,
            per_host: 20,
            shutdown_timeout_ms: 60_000,
        }
    }
}

impl CrawlerConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: env!("CARGO_PKG_NAME").to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
            contact_email: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value
    ///
    /// Format: `Name/Version (+ContactURL; ContactEmail)`, with the parenthesized
    /// part reduced or omitted when contact details are not configured.
    pub fn header_value(&self) -> String {
        let product = format!("{}/{}", self.crawler_name, self.crawler_version);
        match (&self.contact_url, &self.contact_email) {
            (Some(url), Some(email)) => format!("{} (+{}; {})", product, url, email),
            (Some(url), None) => format!("{} (+{})", product, url),
            (None, Some(email)) => format!("{} ({})", product, email),
            (None, None) => product,
        }
    }
}

/// HTTP client configuration used by the built-in downloader
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Total time allowed for one request (milliseconds)
    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,

    /// Time allowed to establish a connection (milliseconds)
    #[serde(rename = "connect-timeout-ms")]
    pub connect_timeout_ms: u64,

    /// Maximum number of redirects followed per request
    #[serde(rename = "max-redirects")]
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
            max_redirects: 10,
        }
    }
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
