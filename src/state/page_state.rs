//! Page state definitions for tracking crawl progress
//!
//! A URL that has not been seen is simply absent from the ledger; every other
//! position of the traversal state machine is one of these variants.

use std::fmt;

/// Represents the current state of a URL within one crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Active States =====
    /// URL has been claimed and is waiting for its host gate
    Queued,

    /// The downloader is fetching the URL
    Fetching,

    /// Document is on the extraction pool
    Extracting,

    // ===== Terminal Success States =====
    /// Fetched at the last level of depth; no extraction needed
    Fetched,

    /// Fetched and its links were fed back into the crawl
    Extracted,

    // ===== Terminal Error States =====
    /// Fetch failed or was cancelled
    FetchFailed,

    /// Link extraction failed or was cancelled
    ExtractFailed,

    // ===== Special States =====
    /// URL could not be resolved to a host and was dropped
    Invalid,
}

impl PageState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true if the URL is still being processed
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Fetching | Self::Extracting)
    }

    /// Returns true if this represents a successful download
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Fetched | Self::Extracted)
    }

    /// Returns true if this represents a recorded failure
    pub fn is_error(&self) -> bool {
        matches!(self, Self::FetchFailed | Self::ExtractFailed)
    }

    /// Checks whether moving from `self` to `next` follows the traversal state machine
    ///
    /// `Fetching` may go straight to `Extracting` because a fetched document is
    /// handed to the extraction pool in the same step.
    pub fn can_transition_to(&self, next: PageState) -> bool {
        use PageState::*;
        matches!(
            (self, next),
            (Queued, Fetching)
                | (Queued, FetchFailed)
                | (Queued, Invalid)
                | (Fetching, Fetched)
                | (Fetching, FetchFailed)
                | (Fetching, Extracting)
                | (Fetched, Extracting)
                | (Extracting, Extracted)
                | (Extracting, ExtractFailed)
        )
    }

    /// Short lowercase name used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Fetched => "fetched",
            Self::Extracted => "extracted",
            Self::FetchFailed => "fetch_failed",
            Self::ExtractFailed => "extract_failed",
            Self::Invalid => "invalid",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
