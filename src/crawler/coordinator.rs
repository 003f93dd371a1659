//! Crawler coordinator - the public crawl entry point
//!
//! This module owns the shared pieces of every crawl:
//! - The fetch collaborator
//! - The download and extract worker pools
//! - The per-host admission limit
//!
//! Each `download` call gets its own session on top of them, seeds it, and
//! waits for its pending work to drain.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::Downloader;
use crate::crawler::pool::WorkerPool;
use crate::crawler::tasks;
use crate::state::{CrawlResult, CrawlSession, CrawlTask};
use crate::url::host_of;
use crate::{CrawlError, CrawlerError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

/// State shared by every task of every crawl
pub(crate) struct CrawlContext<D: Downloader> {
    pub(crate) downloader: D,
    pub(crate) download_pool: WorkerPool,
    pub(crate) extract_pool: WorkerPool,
    pub(crate) per_host: usize,
}

/// Depth-bounded crawler with two worker pools and per-host admission
///
/// Concurrent `download` calls are independent: each gets a fresh session and
/// shares only the pools. Dropping the crawler without calling
/// [`close`](WebCrawler::close) lets the workers finish the queued jobs and exit.
///
/// # Example
///
/// ```no_run
/// use web_crawler::config::Config;
/// use web_crawler::crawler::{HttpDownloader, WebCrawler};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let downloader = HttpDownloader::new(&config.user_agent, &config.http)?;
/// let crawler = WebCrawler::new(downloader, &config.crawler)?;
///
/// let result = crawler.download("https://example.com/", 2).await;
/// println!("{} pages, {} errors", result.downloaded.len(), result.errors.len());
///
/// crawler.close().await;
/// # Ok(())
/// # }
/// ```
pub struct WebCrawler<D: Downloader> {
    context: Arc<CrawlContext<D>>,
    close_grace: Duration,
}

impl<D: Downloader> WebCrawler<D> {
    /// Creates a crawler and starts its worker pools
    ///
    /// Must be called from within a Tokio runtime; the pools' workers are
    /// spawned on it.
    ///
    /// # Returns
    ///
    /// * `Ok(WebCrawler)` - Pools are running
    /// * `Err(CrawlerError::Runtime)` - No Tokio runtime is active
    pub fn new(downloader: D, config: &CrawlerConfig) -> Result<Self, CrawlerError> {
        let runtime = Handle::try_current()?;

        let context = CrawlContext {
            downloader,
            download_pool: WorkerPool::new("download", config.downloaders, &runtime),
            extract_pool: WorkerPool::new("extract", config.extractors, &runtime),
            per_host: config.per_host.max(1),
        };

        Ok(Self {
            context: Arc::new(context),
            close_grace: Duration::from_secs(config.close_grace_secs),
        })
    }

    /// The fetch collaborator
    pub fn downloader(&self) -> &D {
        &self.context.downloader
    }

    /// Crawls `url` and everything reachable from it within `depth` hops
    ///
    /// A task at depth 1 is fetched but its links are not followed, so
    /// `depth = 1` fetches only the seed. The call waits until every task of
    /// this crawl has finished.
    ///
    /// The crawl is best-effort: failed fetches are recorded per URL in
    /// `errors` and never abort sibling work. The only failure that stops the
    /// crawl before it starts is a seed without a resolvable host, recorded as
    /// [`CrawlError::Seed`].
    pub async fn download(&self, url: &str, depth: u32) -> CrawlResult {
        let session = Arc::new(CrawlSession::new(self.context.per_host));

        let host = match host_of(url) {
            Ok(host) => host,
            Err(source) => {
                tracing::warn!("Rejecting seed {}: {}", url, source);
                session.record_error(
                    url,
                    CrawlError::Seed {
                        url: url.to_string(),
                        source,
                    },
                );
                return session.take_result();
            }
        };

        if depth == 0 {
            tracing::debug!("Depth 0 for {}, nothing to crawl", url);
            return session.take_result();
        }

        tracing::info!("Starting crawl of {} (depth {})", url, depth);
        let start_time = Instant::now();

        let queue = session.host_queue(&host);
        queue.push(CrawlTask::new(url, depth));
        tasks::submit_fetch(&self.context, &session, queue);

        session.pending().wait_idle().await;

        let result = session.take_result();
        tracing::info!(
            "Crawl of {} finished: {} downloaded, {} errors across {} hosts in {:?}",
            url,
            result.downloaded.len(),
            result.errors.len(),
            session.host_count(),
            start_time.elapsed()
        );
        result
    }

    /// Stops both pools
    ///
    /// No new work is admitted; queued and running tasks get the configured
    /// grace period to finish before their workers are aborted. Must not
    /// overlap an unfinished `download`, and `download` must not be called
    /// afterwards: its seed would be refused and it would return an empty
    /// result.
    pub async fn close(&self) {
        tracing::info!("Shutting down worker pools");
        let (downloads, extracts) = tokio::join!(
            self.context.download_pool.shutdown(self.close_grace),
            self.context.extract_pool.shutdown(self.close_grace)
        );
        if downloads + extracts > 0 {
            tracing::warn!(
                "Aborted {} download and {} extract workers",
                downloads,
                extracts
            );
        }
    }
}
