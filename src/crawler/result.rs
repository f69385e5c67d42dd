use crate::CrawlFailure;
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of one crawl
///
/// `downloaded` and the keys of `errors` never overlap.
#[derive(Debug, Default)]
pub struct CrawlResult {
    /// URLs that were fetched (and, where depth allowed, extracted) without error
    pub downloaded: BTreeSet<String>,

    /// Failure recorded for each URL that did not succeed
    pub errors: BTreeMap<String, CrawlFailure>,
}

impl CrawlResult {
    /// Returns true if nothing was visited
    pub fn is_empty(&self) -> bool {
        self.downloaded.is_empty() && self.errors.is_empty()
    }

    /// Total number of URLs with an outcome
    pub fn visited(&self) -> usize {
        self.downloaded.len() + self.errors.len()
    }

    pub fn is_downloaded(&self, url: &str) -> bool {
        self.downloaded.contains(url)
    }

    pub fn error(&self, url: &str) -> Option<&CrawlFailure> {
        self.errors.get(url)
    }

    /// URLs whose work was cut short by crawler shutdown
    pub fn cancelled(&self) -> impl Iterator<Item = &str> {
        self.errors
            .iter()
            .filter(|(_, failure)| failure.is_cancelled())
            .map(|(url, _)| url.as_str())
    }
}
