//! Fetch and extract task bodies
//!
//! Every submission registers a pending unit first and moves the guard into
//! the job, so the unit is released after the body finishes or when a closed
//! pool drops the job unrun.

use crate::crawler::coordinator::CrawlContext;
use crate::crawler::fetcher::{Document, Downloader};
use crate::state::{CrawlSession, CrawlTask, HostQueue, PendingGuard};
use crate::url::host_of;
use crate::CrawlError;
use futures::future::{BoxFuture, FutureExt};
use std::collections::HashSet;
use std::sync::Arc;

/// Submits a fetch task that drains `queue`
pub(crate) fn submit_fetch<D: Downloader>(
    context: &Arc<CrawlContext<D>>,
    session: &Arc<CrawlSession>,
    queue: Arc<HostQueue>,
) {
    let guard = session.pending().enter();
    let job = fetch_task(Arc::clone(context), Arc::clone(session), queue, guard);
    if let Err(e) = context.download_pool.submit(job) {
        tracing::warn!("Dropping fetch task: {}", e);
    }
}

/// Submits an extract task for a fetched document
fn submit_extract<D: Downloader>(
    context: &Arc<CrawlContext<D>>,
    session: &Arc<CrawlSession>,
    document: D::Document,
    depth: u32,
) {
    let guard = session.pending().enter();
    let job = extract_task(
        Arc::clone(context),
        Arc::clone(session),
        document,
        depth,
        guard,
    );
    if let Err(e) = context.extract_pool.submit(job) {
        tracing::warn!("Dropping extract task: {}", e);
    }
}

/// Fetches from one host's backlog while holding an admission permit
///
/// Turned away immediately when the host has no free permit: the permit
/// holders keep popping until the backlog is empty.
fn fetch_task<D: Downloader>(
    context: Arc<CrawlContext<D>>,
    session: Arc<CrawlSession>,
    queue: Arc<HostQueue>,
    guard: PendingGuard,
) -> BoxFuture<'static, ()> {
    async move {
        let _guard = guard;

        let Some((mut permit, mut task)) = queue.try_admit() else {
            tracing::trace!("No admission for {}: busy or drained", queue.host());
            return;
        };

        loop {
            fetch_one(&context, &session, task).await;
            match permit.next_task() {
                Some(next) => task = next,
                None => break,
            }
        }
    }
    .boxed()
}

async fn fetch_one<D: Downloader>(
    context: &Arc<CrawlContext<D>>,
    session: &Arc<CrawlSession>,
    task: CrawlTask,
) {
    if !session.mark_visited(&task.url) {
        tracing::trace!("Already visited {}", task.url);
        return;
    }

    tracing::debug!("Fetching {} (depth {})", task.url, task.depth);
    match context.downloader.download(&task.url).await {
        Ok(document) => {
            session.record_download(&task.url);
            if task.depth > 1 {
                submit_extract(context, session, document, task.depth);
            }
        }
        Err(e) => {
            tracing::debug!("Failed to fetch {}: {}", task.url, e);
            session.record_error(&task.url, CrawlError::Fetch(e));
        }
    }
}

/// Queues every distinct link of `document` one hop deeper
fn extract_task<D: Downloader>(
    context: Arc<CrawlContext<D>>,
    session: Arc<CrawlSession>,
    document: D::Document,
    depth: u32,
    guard: PendingGuard,
) -> BoxFuture<'static, ()> {
    async move {
        let _guard = guard;

        // HTML parsing is CPU-bound; keep it off the runtime workers.
        let extracted = tokio::task::spawn_blocking(move || document.extract_links()).await;

        // The document's own URL is already downloaded; a failed extraction
        // only means there is nothing to follow.
        let links = match extracted {
            Ok(Ok(links)) => links,
            Ok(Err(e)) => {
                tracing::debug!("Link extraction failed: {}", e);
                return;
            }
            Err(e) => {
                tracing::warn!("Link extraction task failed: {}", e);
                return;
            }
        };

        let mut seen = HashSet::with_capacity(links.len());
        for link in links {
            if !seen.insert(link.clone()) {
                continue;
            }

            let host = match host_of(&link) {
                Ok(host) => host,
                Err(e) => {
                    tracing::trace!("Skipping link {}: {}", link, e);
                    continue;
                }
            };

            let queue = session.host_queue(&host);
            queue.push(CrawlTask::new(link, depth - 1));
            submit_fetch(&context, &session, queue);
        }
    }
    .boxed()
}
