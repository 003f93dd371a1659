use super::{lock, HostQueue, PendingCounter};
use crate::CrawlError;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Outcome of one crawl: every URL that was fetched, and every URL that failed
#[derive(Debug, Default)]
pub struct CrawlResult {
    /// URLs fetched successfully
    pub downloaded: HashSet<String>,

    /// URLs that failed, with the reason; disjoint from `downloaded`
    pub errors: HashMap<String, CrawlError>,
}

impl CrawlResult {
    /// Returns whether nothing was downloaded and nothing failed
    pub fn is_empty(&self) -> bool {
        self.downloaded.is_empty() && self.errors.is_empty()
    }
}

/// State of a single `download` call
///
/// Created fresh for every crawl and handed to every task of that crawl, so
/// concurrent crawls never see each other's visited URLs or host queues.
#[derive(Debug)]
pub struct CrawlSession {
    /// Per-host concurrency limit for queues created by this session
    per_host: usize,

    /// URLs whose fetch has started; written once per URL
    visited: Mutex<HashSet<String>>,

    downloaded: Mutex<HashSet<String>>,

    errors: Mutex<HashMap<String, CrawlError>>,

    /// One queue per host, created on first sight
    hosts: Mutex<HashMap<String, Arc<HostQueue>>>,

    pending: Arc<PendingCounter>,
}

impl CrawlSession {
    /// Creates an empty session whose host queues admit `per_host` fetches
    pub fn new(per_host: usize) -> Self {
        Self {
            per_host,
            visited: Mutex::new(HashSet::new()),
            downloaded: Mutex::new(HashSet::new()),
            errors: Mutex::new(HashMap::new()),
            hosts: Mutex::new(HashMap::new()),
            pending: Arc::new(PendingCounter::new()),
        }
    }

    /// Returns the queue for `host`, creating it if this is the first sighting
    ///
    /// Two tasks racing on a new host get the same queue.
    pub fn host_queue(&self, host: &str) -> Arc<HostQueue> {
        let mut hosts = lock(&self.hosts);
        if let Some(queue) = hosts.get(host) {
            return Arc::clone(queue);
        }
        let queue = Arc::new(HostQueue::new(host, self.per_host));
        hosts.insert(host.to_string(), Arc::clone(&queue));
        queue
    }

    /// Number of distinct hosts seen so far
    pub fn host_count(&self) -> usize {
        lock(&self.hosts).len()
    }

    /// Marks `url` as visited; returns `false` if it already was
    pub fn mark_visited(&self, url: &str) -> bool {
        let mut visited = lock(&self.visited);
        if visited.contains(url) {
            return false;
        }
        visited.insert(url.to_string())
    }

    /// Returns whether `url` has been visited
    pub fn is_visited(&self, url: &str) -> bool {
        lock(&self.visited).contains(url)
    }

    /// Records a successful fetch
    pub fn record_download(&self, url: &str) {
        lock(&self.downloaded).insert(url.to_string());
    }

    /// Records a failure for `url`
    pub fn record_error(&self, url: &str, error: CrawlError) {
        lock(&self.errors).insert(url.to_string(), error);
    }

    /// The session's pending-work counter
    pub fn pending(&self) -> &Arc<PendingCounter> {
        &self.pending
    }

    /// Moves the collected downloads and errors out of the session
    ///
    /// Called once the pending counter has drained; no task touches the
    /// result sets after that point.
    pub fn take_result(&self) -> CrawlResult {
        CrawlResult {
            downloaded: std::mem::take(&mut *lock(&self.downloaded)),
            errors: std::mem::take(&mut *lock(&self.errors)),
        }
    }
}
