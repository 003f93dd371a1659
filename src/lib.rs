//! web-crawler: a depth-bounded concurrent web crawler
//!
//! This crate crawls a seed URL and everything it links to, up to a hop budget,
//! using two fixed-size worker pools (downloads and link extraction) and a
//! per-host concurrency cap that is independent of the pool sizes.

pub mod config;
pub mod crawler;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for crawler construction and the command line
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Crawler must be created inside a Tokio runtime: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Missing host in URL")]
    MissingDomain,
}

/// Failure of the fetch collaborator for a single URL
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Expected HTML from {url}, got {content_type}")]
    ContentMismatch { url: String, content_type: String },
}

/// Failure of the link-extraction collaborator for a single document
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("HTML parse error for {url}: {message}")]
    Parse { url: String, message: String },
}

/// Per-URL error recorded in a crawl result
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Invalid seed URL {url}: {source}")]
    Seed {
        url: String,
        #[source]
        source: UrlError,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use crate::config::Config;
pub use crate::crawler::{Document, Downloader, HtmlDocument, HttpDownloader, WebCrawler};
pub use crate::state::{CrawlResult, CrawlSession, CrawlTask, HostQueue};
pub use crate::url::host_of;
