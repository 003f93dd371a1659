//! Crawler module for fetching pages and following their links
//!
//! This module contains the core crawling logic, including:
//! - The coordinator and its public `download`/`close` surface
//! - Fetch and extract task bodies
//! - The fixed-size worker pools they run on
//! - HTTP fetching and HTML link extraction

mod coordinator;
mod fetcher;
mod parser;
mod pool;
mod tasks;

pub use coordinator::WebCrawler;
pub use fetcher::{build_http_client, fetch_url, Document, Downloader, HttpDownloader};
pub use parser::{extract_links, HtmlDocument};
pub use pool::{PoolError, WorkerPool};

use crate::config::Config;
use crate::state::CrawlResult;
use crate::CrawlerError;

/// Crawls `url` over HTTP with a crawler built from `config`
///
/// Builds the HTTP downloader and the pools, runs one crawl, and closes the
/// pools again.
///
/// # Returns
///
/// * `Ok(CrawlResult)` - The crawl ran; per-URL failures are inside the result
/// * `Err(CrawlerError)` - The HTTP client or the pools could not be set up
pub async fn crawl(config: &Config, url: &str, depth: u32) -> Result<CrawlResult, CrawlerError> {
    let downloader = HttpDownloader::new(&config.user_agent, &config.http)?;
    let crawler = WebCrawler::new(downloader, &config.crawler)?;

    let result = crawler.download(url, depth).await;
    crawler.close().await;

    Ok(result)
}
