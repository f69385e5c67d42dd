use crate::{UrlError, UrlResult};
use url::Url;

/// Extracts the host from a parsed URL
///
/// The host is lowercased; ports are not part of it.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use parcrawl::url::extract_host;
///
/// let url = Url::parse("https://EXAMPLE.COM:8080/path").unwrap();
/// assert_eq!(extract_host(&url), Some("example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
}

/// Resolves the host a URL string belongs to
///
/// This is the key the crawler uses for per-host admission control. A URL that
/// does not parse or has no host cannot be fetched and is reported as an error.
///
/// # Examples
///
/// ```
/// use parcrawl::url::host_of;
///
/// assert_eq!(host_of("https://blog.example.com/post").unwrap(), "blog.example.com");
/// assert!(host_of("not a url").is_err());
/// ```
pub fn host_of(url: &str) -> UrlResult<String> {
    let parsed = Url::parse(url).map_err(|e| UrlError::Parse(format!("{}: {}", url, e)))?;
    extract_host(&parsed).ok_or_else(|| UrlError::MissingHost(url.to_string()))
}
