//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests with reqwest following redirects up to the configured limit
//! - Error classification into [`FetchError`]

use crate::config::{Config, HttpConfig, UserAgentConfig};
use crate::crawler::{Downloader, HtmlDocument};
use crate::FetchError;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect::Policy, Client};

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - Identity sent with every request
/// * `http` - Timeouts and redirect limit
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use parcrawl::config::{HttpConfig, UserAgentConfig};
/// use parcrawl::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), &HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    http: &HttpConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(http.request_timeout())
        .connect_timeout(http.connect_timeout())
        .redirect(Policy::limited(http.max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Downloads pages over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    /// Creates a downloader with a client built from configuration
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.user_agent, &config.http)?;
        Ok(Self { client })
    }
}

impl Downloader for HttpDownloader {
    type Document = HtmlDocument;

    /// Fetches a URL
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 2xx | Document based at the final URL after redirects |
    /// | Other status | `FetchError::Status` |
    /// | Timeout | `FetchError::Timeout` |
    /// | Connection failure | `FetchError::Unreachable` |
    /// | Anything else, including body read failures | `FetchError::Http` |
    async fn download(&self, url: &str) -> Result<HtmlDocument, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response.text().await.map_err(|e| classify_error(url, e))?;

        if final_url != url {
            tracing::trace!("{} redirected to {}", url, final_url);
        }

        Ok(HtmlDocument::new(final_url, body, is_html(&content_type)))
    }
}

/// Maps a reqwest failure to the crawler's error type
fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Unreachable {
            url: url.to_string(),
        }
    } else {
        FetchError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

/// Returns true if a Content-Type header value denotes HTML
///
/// A missing header is treated as HTML.
fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime.is_empty() || mime == "text/html" || mime == "application/xhtml+xml"
}
