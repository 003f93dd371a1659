use super::lock;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A URL waiting to be fetched, with its remaining hop budget
///
/// A task at depth 1 is fetched but its links are not followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    /// The URL to fetch
    pub url: String,

    /// Remaining depth, always >= 1
    pub depth: u32,
}

impl CrawlTask {
    /// Creates a new crawl task
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        debug_assert!(depth >= 1, "crawl tasks carry a depth of at least 1");
        Self {
            url: url.into(),
            depth,
        }
    }
}

#[derive(Debug, Default)]
struct Backlog {
    tasks: VecDeque<CrawlTask>,
    active: usize,
}

/// Per-host FIFO backlog plus admission permits
///
/// At most `capacity` fetches for the host run at once: a fetch task must hold
/// a [`HostPermit`] to pop from the backlog. The backlog and the permit count
/// share one mutex, so appending, popping and releasing are all atomic with
/// respect to each other.
#[derive(Debug)]
pub struct HostQueue {
    host: String,
    capacity: usize,
    backlog: Mutex<Backlog>,
}

impl HostQueue {
    /// Creates an idle queue for `host` admitting `capacity` concurrent fetches
    pub fn new(host: impl Into<String>, capacity: usize) -> Self {
        Self {
            host: host.into(),
            capacity: capacity.max(1),
            backlog: Mutex::new(Backlog::default()),
        }
    }

    /// The host this queue belongs to
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The per-host concurrency limit
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends a task to the back of the backlog
    pub fn push(&self, task: CrawlTask) {
        lock(&self.backlog).tasks.push_back(task);
    }

    /// Number of tasks waiting in the backlog
    pub fn len(&self) -> usize {
        lock(&self.backlog).tasks.len()
    }

    /// Returns whether the backlog is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of permits currently held
    pub fn active(&self) -> usize {
        lock(&self.backlog).active
    }

    /// Tries to take a permit together with the oldest backlog entry
    ///
    /// Returns `None` without blocking when every permit is held (an active
    /// fetch task will drain the backlog) or when there is nothing to fetch.
    pub fn try_admit(self: &Arc<Self>) -> Option<(HostPermit, CrawlTask)> {
        let mut backlog = lock(&self.backlog);
        if backlog.active >= self.capacity {
            return None;
        }
        let task = backlog.tasks.pop_front()?;
        backlog.active += 1;
        drop(backlog);

        Some((
            HostPermit {
                queue: Arc::clone(self),
                held: true,
            },
            task,
        ))
    }
}

/// An admission permit for one host
///
/// Released either by [`HostPermit::next_task`] finding the backlog empty or
/// when the permit is dropped.
#[derive(Debug)]
pub struct HostPermit {
    queue: Arc<HostQueue>,
    held: bool,
}

impl HostPermit {
    /// Pops the next backlog entry while keeping the permit
    ///
    /// When the backlog is empty the permit is released in the same critical
    /// section and `None` is returned. A task appended afterwards therefore
    /// always finds a free permit for the fetch task submitted with it.
    pub fn next_task(&mut self) -> Option<CrawlTask> {
        if !self.held {
            return None;
        }
        let mut backlog = lock(&self.queue.backlog);
        let next = backlog.tasks.pop_front();
        if next.is_none() {
            backlog.active -= 1;
            self.held = false;
        }
        next
    }
}

impl Drop for HostPermit {
    fn drop(&mut self) {
        if self.held {
            lock(&self.queue.backlog).active -= 1;
        }
    }
}
