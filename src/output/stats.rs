//! Statistics generation from a crawl result
//!
//! This module provides functionality for summarizing a finished crawl and
//! displaying the summary.

use crate::crawler::CrawlResult;
use crate::url::host_of;
use crate::{CrawlFailure, Stage};
use std::collections::HashSet;
use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlStatistics {
    /// Pages downloaded without error
    pub downloaded: usize,

    /// Pages with a recorded failure
    pub failed: usize,

    /// Failures while fetching
    pub fetch_failures: usize,

    /// Failures while extracting links
    pub extract_failures: usize,

    /// Work cut short by crawler shutdown
    pub cancelled: usize,

    /// Distinct hosts among all visited URLs
    pub unique_hosts: usize,

    /// Wall-clock time of the crawl
    pub elapsed: Duration,
}

impl CrawlStatistics {
    /// Summarizes a crawl result
    pub fn from_result(result: &CrawlResult, elapsed: Duration) -> Self {
        let mut stats = Self {
            downloaded: result.downloaded.len(),
            failed: result.errors.len(),
            fetch_failures: 0,
            extract_failures: 0,
            cancelled: 0,
            unique_hosts: 0,
            elapsed,
        };

        for failure in result.errors.values() {
            match failure {
                CrawlFailure::Cancelled { .. } => stats.cancelled += 1,
                _ if failure.stage() == Stage::Fetch => stats.fetch_failures += 1,
                _ => stats.extract_failures += 1,
            }
        }

        stats.unique_hosts = result
            .downloaded
            .iter()
            .chain(result.errors.keys())
            .filter_map(|url| host_of(url).ok())
            .collect::<HashSet<_>>()
            .len();

        stats
    }

    /// Total URLs with an outcome
    pub fn total(&self) -> usize {
        self.downloaded + self.failed
    }

    /// Downloaded pages per second of wall-clock time
    pub fn pages_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.downloaded as f64 / secs
        } else {
            0.0
        }
    }

    /// Percentage of visited URLs that were downloaded
    pub fn success_rate(&self) -> f64 {
        if self.total() > 0 {
            (self.downloaded as f64 / self.total() as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Prints statistics to stderr in a formatted manner
///
/// Stdout is left to the report itself.
pub fn print_statistics(stats: &CrawlStatistics) {
    eprintln!("=== Crawl Statistics ===\n");

    eprintln!("Overview:");
    eprintln!("  URLs visited: {}", stats.total());
    eprintln!("  Unique hosts: {}", stats.unique_hosts);
    eprintln!("  Downloaded: {}", stats.downloaded);
    eprintln!("  Failed: {}", stats.failed);
    eprintln!();

    if stats.failed > 0 {
        eprintln!("Error Summary:");
        eprintln!("  Fetch: {}", stats.fetch_failures);
        eprintln!("  Extraction: {}", stats.extract_failures);
        eprintln!("  Cancelled: {}", stats.cancelled);
        eprintln!();
    }

    eprintln!(
        "Elapsed: {:.2}s ({:.2} pages/sec)",
        stats.elapsed.as_secs_f64(),
        stats.pages_per_second()
    );
    eprintln!(
        "Success Rate: {:.1}% ({} / {} URLs downloaded)",
        stats.success_rate(),
        stats.downloaded,
        stats.total()
    );
}
