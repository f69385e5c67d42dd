//! Output module for crawl reports
//!
//! This module handles:
//! - Writing the downloaded and failed URL lists as text or JSON
//! - Computing and printing crawl statistics

pub mod stats;

pub use stats::{print_statistics, CrawlStatistics};

use crate::crawler::CrawlResult;
use crate::{CrawlerError, Stage};
use serde::Serialize;
use std::io::Write;

/// Report format for a crawl result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// `Downloaded:` list followed by an `Errors:` list
    #[default]
    Text,

    /// One JSON object with `downloaded` and `errors` arrays
    Json,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    downloaded: Vec<&'a str>,
    errors: Vec<JsonError<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonError<'a> {
    url: &'a str,
    stage: &'static str,
    cancelled: bool,
    message: String,
}

/// Writes a crawl result in the requested format
///
/// URLs appear in sorted order in both formats.
///
/// # Example
///
/// ```
/// use parcrawl::output::{write_report, OutputFormat};
/// use parcrawl::CrawlResult;
///
/// let mut result = CrawlResult::default();
/// result.downloaded.insert("https://example.com/".to_string());
///
/// let mut out = Vec::new();
/// write_report(&mut out, &result, OutputFormat::Text).unwrap();
/// assert_eq!(String::from_utf8(out).unwrap(), "Downloaded:\nhttps://example.com/\nErrors:\n");
/// ```
pub fn write_report<W: Write>(
    writer: &mut W,
    result: &CrawlResult,
    format: OutputFormat,
) -> Result<(), CrawlerError> {
    match format {
        OutputFormat::Text => {
            writeln!(writer, "Downloaded:")?;
            for url in &result.downloaded {
                writeln!(writer, "{}", url)?;
            }

            writeln!(writer, "Errors:")?;
            for (url, failure) in &result.errors {
                writeln!(writer, "{}: {}", url, failure)?;
            }
        }
        OutputFormat::Json => {
            let report = JsonReport {
                downloaded: result.downloaded.iter().map(String::as_str).collect(),
                errors: result
                    .errors
                    .iter()
                    .map(|(url, failure)| JsonError {
                        url,
                        stage: stage_name(failure.stage()),
                        cancelled: failure.is_cancelled(),
                        message: failure.to_string(),
                    })
                    .collect(),
            };
            serde_json::to_writer_pretty(&mut *writer, &report)?;
            writeln!(writer)?;
        }
    }

    writer.flush()?;
    Ok(())
}

fn stage_name(stage: Stage) -> &'static str {
    match stage {
        Stage::Fetch => "fetch",
        Stage::Extract => "extract",
    }
}
