use url::Url;

/// Extracts the host from a parsed URL
///
/// The host is lowercased; the port is not part of it, so `a.com:80` and
/// `a.com:8080` share one host queue.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use web_crawler::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("mailto:someone@example.com").unwrap();
/// assert_eq!(extract_domain(&url), None);
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
}
