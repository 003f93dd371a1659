//! URL handling module
//!
//! Host resolution is the only URL concern of the crawler: the host is the key
//! for per-host admission control. URLs themselves are compared as plain strings.

mod domain;

use crate::{UrlError, UrlResult};
use ::url::Url;

pub use domain::extract_domain;

/// Resolves the host of a URL string
///
/// The URL is parsed and its host is returned lowercased. Fails when the URL
/// cannot be parsed or carries no host (e.g. `mailto:` or `data:` URLs).
///
/// # Examples
///
/// ```
/// use web_crawler::url::host_of;
///
/// assert_eq!(host_of("https://Example.com/a?b=c").unwrap(), "example.com");
/// assert!(host_of("not a url").is_err());
/// assert!(host_of("mailto:someone@example.com").is_err());
/// ```
pub fn host_of(url: &str) -> UrlResult<String> {
    let parsed = Url::parse(url).map_err(|e| UrlError::Parse(format!("{}: {}", url, e)))?;
    extract_domain(&parsed).ok_or(UrlError::MissingDomain)
}
