//! Fetch collaborator
//!
//! This module defines the seams the coordinator fetches through:
//! - [`Downloader`]: URL in, document out
//! - [`Document`]: a fetched page that can list its outgoing links
//!
//! and the HTTP implementation used by the command line, [`HttpDownloader`].

use crate::config::{HttpConfig, UserAgentConfig};
use crate::crawler::parser::HtmlDocument;
use crate::{ExtractError, FetchError};
use reqwest::{redirect::Policy, Client};
use std::future::Future;
use std::time::Duration;

/// Fetches documents by URL
///
/// Called concurrently from every download worker, so implementations must be
/// `Send + Sync`. Any timeout policy belongs to the implementation.
pub trait Downloader: Send + Sync + 'static {
    /// The document type produced by a successful fetch
    type Document: Document;

    /// Fetches `url`
    fn download(&self, url: &str)
        -> impl Future<Output = Result<Self::Document, FetchError>> + Send;
}

/// A fetched document
pub trait Document: Send + 'static {
    /// Returns the absolute URLs this document links to
    fn extract_links(&self) -> Result<Vec<String>, ExtractError>;
}

/// Maximum number of redirects followed per request
const MAX_REDIRECTS: usize = 10;

/// Downloads HTML pages over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    /// Builds a downloader with the configured identity and timeouts
    pub fn new(user_agent: &UserAgentConfig, http: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(user_agent, http)?,
        })
    }
}

impl Downloader for HttpDownloader {
    type Document = HtmlDocument;

    fn download(&self, url: &str) -> impl Future<Output = Result<HtmlDocument, FetchError>> + Send {
        fetch_url(&self.client, url)
    }
}

/// Builds an HTTP client with proper configuration
///
/// The user agent follows `CrawlerName/Version (+ContactURL; ContactEmail)`.
///
/// # Example
///
/// ```no_run
/// use web_crawler::config::{HttpConfig, UserAgentConfig};
/// use web_crawler::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), &HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    http: &HttpConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(http.timeout_secs))
        .connect_timeout(Duration::from_secs(http.connect_timeout_secs))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and classifies the outcome
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx with `text/html` | `Ok(HtmlDocument)` |
/// | 2xx with another Content-Type | `ContentMismatch` |
/// | Non-2xx status | `Status` |
/// | Timeout | `Timeout` |
/// | Connection or body error | `Network` |
pub async fn fetch_url(client: &Client, url: &str) -> Result<HtmlDocument, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| classify_error(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !content_type.contains("text/html") {
        return Err(FetchError::ContentMismatch {
            url: url.to_string(),
            content_type,
        });
    }

    // Relative links resolve against where the redirects ended up.
    let final_url = response.url().clone();
    let body = response.text().await.map_err(|e| classify_error(url, e))?;

    Ok(HtmlDocument::new(final_url, body))
}

fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Network {
            url: url.to_string(),
            message: "Connection refused".to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
