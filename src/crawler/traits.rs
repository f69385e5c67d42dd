//! Seams between the crawl engine and the code that fetches and parses pages

use crate::{ExtractError, FetchError};
use std::future::Future;

/// Fetches the content behind a URL
///
/// Implementations must be safe to call concurrently; the crawler bounds how
/// many calls are in flight, globally and per host.
pub trait Downloader: Send + Sync + 'static {
    /// The fetched content handed to link extraction
    type Document: Document;

    fn download(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Self::Document, FetchError>> + Send;
}

/// A fetched page that can list the URLs it links to
pub trait Document: Send + 'static {
    /// Returns the page's outgoing links
    ///
    /// This may block; the crawler runs it on the blocking thread pool.
    fn extract_links(self) -> Result<Vec<String>, ExtractError>;
}
