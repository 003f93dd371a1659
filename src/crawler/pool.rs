//! Fixed-size worker pool
//!
//! A pool is N long-lived Tokio tasks pulling boxed jobs from one shared
//! channel. Jobs are short units of work; a panicking job is caught and logged
//! so the worker keeps serving the queue.

use crate::state::lock;
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

type Job = BoxFuture<'static, ()>;

/// Errors returned by [`WorkerPool`]
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Worker pool '{0}' is closed")]
    Closed(&'static str),
}

/// A fixed number of workers executing submitted jobs
pub struct WorkerPool {
    name: &'static str,
    size: usize,
    sender: Mutex<Option<UnboundedSender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawns `size` workers on the given runtime
    pub fn new(name: &'static str, size: usize, runtime: &Handle) -> Self {
        let size = size.max(1);
        let (sender, receiver) = mpsc::unbounded_channel::<Job>();
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let workers = (0..size)
            .map(|id| runtime.spawn(run_worker(name, id, Arc::clone(&receiver))))
            .collect();

        tracing::debug!("Started {} pool with {} workers", name, size);

        Self {
            name,
            size,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        }
    }

    /// Returns whether the pool still accepts jobs
    pub fn is_open(&self) -> bool {
        lock(&self.sender).is_some()
    }

    /// Queues a job for execution
    ///
    /// Fails once the pool is closed; the rejected job is dropped without
    /// running, which releases anything it owns.
    pub fn submit<F>(&self, job: F) -> Result<(), PoolError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sender = lock(&self.sender);
        match sender.as_ref() {
            Some(sender) => sender
                .send(job.boxed())
                .map_err(|_| PoolError::Closed(self.name)),
            None => Err(PoolError::Closed(self.name)),
        }
    }

    /// Stops accepting jobs and drains the queue
    ///
    /// Queued and running jobs get up to `grace` to finish; workers still busy
    /// after that are aborted. Returns the number of aborted workers.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        // Dropping the only sender lets workers exit once the queue is empty.
        lock(&self.sender).take();
        let workers = std::mem::take(&mut *lock(&self.workers));
        if workers.is_empty() {
            return 0;
        }

        let aborts: Vec<_> = workers.iter().map(|w| w.abort_handle()).collect();
        if tokio::time::timeout(grace, futures::future::join_all(workers))
            .await
            .is_ok()
        {
            tracing::debug!("{} pool drained", self.name);
            return 0;
        }

        let stragglers = aborts.iter().filter(|a| !a.is_finished()).count();
        for abort in &aborts {
            abort.abort();
        }
        tracing::warn!(
            "{} pool did not drain within {:?}; aborted {} workers",
            self.name,
            grace,
            stragglers
        );
        stragglers
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("open", &self.is_open())
            .finish()
    }
}

async fn run_worker(
    name: &'static str,
    id: usize,
    receiver: Arc<tokio::sync::Mutex<UnboundedReceiver<Job>>>,
) {
    loop {
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };
        if AssertUnwindSafe(job).catch_unwind().await.is_err() {
            tracing::warn!("{} worker {} caught a panicking job", name, id);
        }
    }
    tracing::trace!("{} worker {} exiting", name, id);
}
