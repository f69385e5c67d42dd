use crate::crawler::CrawlResult;
use crate::state::{lock, PageState};
use crate::{CrawlFailure, Stage};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

/// Visited set, per-URL state and error map of one crawl
///
/// Claiming a URL is the point that decides which task owns it: the first
/// claim inserts it, every later claim of the same URL is a no-op. Each map has
/// its own lock and no method holds both at once.
#[derive(Debug, Default)]
pub struct CrawlLedger {
    pages: Mutex<HashMap<String, PageState>>,
    errors: Mutex<HashMap<String, CrawlFailure>>,
}

impl CrawlLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a URL for processing
    ///
    /// Returns `true` only for the first caller; the URL becomes `Queued`.
    pub fn claim(&self, url: &str) -> bool {
        match lock(&self.pages).entry(url.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(PageState::Queued);
                true
            }
        }
    }

    /// Moves a claimed URL to its next state
    ///
    /// Transitions outside the traversal state machine are logged and ignored.
    pub fn advance(&self, url: &str, next: PageState) {
        let mut pages = lock(&self.pages);
        match pages.get_mut(url) {
            Some(current) if current.can_transition_to(next) => *current = next,
            Some(current) => {
                tracing::warn!("Ignoring invalid transition {} -> {} for {}", current, next, url);
            }
            None => tracing::warn!("Cannot move unclaimed URL {} to {}", url, next),
        }
    }

    /// Records a failure for a URL and moves it to the matching failed state
    ///
    /// A later failure for the same URL replaces the earlier one.
    pub fn record_failure(&self, url: &str, failure: CrawlFailure) {
        let next = match failure.stage() {
            Stage::Fetch => PageState::FetchFailed,
            Stage::Extract => PageState::ExtractFailed,
        };
        lock(&self.errors).insert(url.to_string(), failure);
        self.advance(url, next);
    }

    /// Marks a URL that cannot be fetched at all
    pub fn mark_invalid(&self, url: &str) {
        self.advance(url, PageState::Invalid);
    }

    /// Returns the current state of a URL, if it has been claimed
    pub fn state(&self, url: &str) -> Option<PageState> {
        lock(&self.pages).get(url).copied()
    }

    /// Number of claimed URLs
    pub fn visited(&self) -> usize {
        lock(&self.pages).len()
    }

    /// Counts claimed URLs per state
    pub fn count_by_state(&self) -> HashMap<PageState, usize> {
        let mut counts = HashMap::new();
        for state in lock(&self.pages).values() {
            *counts.entry(*state).or_insert(0) += 1;
        }
        counts
    }

    /// Assembles the crawl result, moving the recorded failures out
    ///
    /// Downloaded URLs are the claimed URLs in a success state that have no
    /// recorded failure. URLs marked invalid appear in neither collection.
    pub fn take_result(&self) -> CrawlResult {
        let errors: BTreeMap<String, CrawlFailure> =
            std::mem::take(&mut *lock(&self.errors)).into_iter().collect();

        let downloaded: BTreeSet<String> = lock(&self.pages)
            .iter()
            .filter(|(url, state)| state.is_success() && !errors.contains_key(*url))
            .map(|(url, _)| url.clone())
            .collect();

        CrawlResult { downloaded, errors }
    }
}
