//! HTML parser for extracting links
//!
//! This module turns a fetched page into the list of URLs to follow:
//! - Links from `<a>` tags and canonical links
//! - Resolved against the page's final URL
//! - Normalized and deduplicated

use crate::crawler::Document;
use crate::url::normalize_parsed;
use crate::ExtractError;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// A fetched page ready for link extraction
///
/// Holds the raw body so it can move between threads; the HTML tree is only
/// built inside [`Document::extract_links`].
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    url: String,
    body: String,
    is_html: bool,
}

impl HtmlDocument {
    /// Creates a document
    ///
    /// `url` is the base for relative links. When `is_html` is false the
    /// document yields no links.
    pub fn new(url: impl Into<String>, body: impl Into<String>, is_html: bool) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            is_html,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn is_html(&self) -> bool {
        self.is_html
    }
}

impl Document for HtmlDocument {
    fn extract_links(self) -> Result<Vec<String>, ExtractError> {
        if !self.is_html {
            return Ok(Vec::new());
        }

        let base_url = Url::parse(&self.url).map_err(|source| ExtractError::BaseUrl {
            url: self.url.clone(),
            source,
        })?;

        Ok(parse_links(&self.body, &base_url))
    }
}

/// Extracts the links to follow from HTML content
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links
/// - Anything that is not http(s) after resolution
///
/// `rel="nofollow"` links are followed. Results are normalized and each URL
/// appears once, in document order.
///
/// # Example
///
/// ```
/// use parcrawl::crawler::parse_links;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/page#top">Link</a><a href="/page">Again</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// assert_eq!(parse_links(html, &base_url), vec!["https://example.com/page"]);
/// ```
pub fn parse_links(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let mut push = |href: &str| {
        if let Some(absolute_url) = resolve_link(href, base_url) {
            if seen.insert(absolute_url.clone()) {
                links.push(absolute_url);
            }
        }
    };

    // Extract links from <a> tags
    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            // Skip if it has the download attribute
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    // Extract canonical link
    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    links
}

/// Resolves a link href to a normalized absolute URL
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    normalize_parsed(absolute_url).ok().map(String::from)
}
