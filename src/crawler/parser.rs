//! HTML link extraction
//!
//! This module turns a fetched HTML page into the list of absolute URLs to
//! follow, from `<a href>` and `<link rel="canonical">` elements.

use crate::crawler::fetcher::Document;
use crate::ExtractError;
use scraper::{Html, Selector};
use url::Url;

/// An HTML page fetched by [`HttpDownloader`](crate::crawler::HttpDownloader)
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    /// The URL the body was served from, after redirects
    url: Url,

    /// Raw HTML
    body: String,
}

impl HtmlDocument {
    /// Creates a document from its final URL and body
    pub fn new(url: Url, body: String) -> Self {
        Self { url, body }
    }
}

impl Document for HtmlDocument {
    fn extract_links(&self) -> Result<Vec<String>, ExtractError> {
        extract_links(&self.body, &self.url)
    }
}

/// Parses HTML content and extracts the links to follow
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Fragment-only links
/// - Anything that does not resolve to an HTTP(S) URL
///
/// # Example
///
/// ```
/// use web_crawler::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let links = extract_links(html, &base_url).unwrap();
/// assert_eq!(links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn extract_links(html: &str, base_url: &Url) -> Result<Vec<String>, ExtractError> {
    let anchors = selector("a[href]", base_url)?;
    let canonical = selector("link[rel='canonical'][href]", base_url)?;

    let document = Html::parse_document(html);
    let mut links = Vec::new();

    for element in document.select(&anchors) {
        if element.value().attr("download").is_some() {
            continue;
        }
        if let Some(link) = element.value().attr("href").and_then(|h| resolve_link(h, base_url)) {
            links.push(link);
        }
    }

    for element in document.select(&canonical) {
        if let Some(link) = element.value().attr("href").and_then(|h| resolve_link(h, base_url)) {
            links.push(link);
        }
    }

    Ok(links)
}

fn selector(css: &str, base_url: &Url) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Parse {
        url: base_url.to_string(),
        message: format!("invalid selector {}: {:?}", css, e),
    })
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url.to_string()),
        _ => None,
    }
}
