//! Unbounded work queue feeding a fixed-size worker pool.
//!
//! Ingestion never waits: enqueueing is an unbounded channel send. The
//! dispatcher pulls one item at a time and spawns a task for it; the task
//! waits for one of `workers` permits, so the dispatcher never waits on a
//! busy pool. Every item gets exactly one attempt and failures stop at the
//! task boundary.

use async_trait::async_trait;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

use crate::error::PipelineResult;

/// One file to process, identified by its depot path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem {
    depot_path: String,
}

impl WorkItem {
    pub fn new(depot_path: impl Into<String>) -> Self {
        Self {
            depot_path: depot_path.into(),
        }
    }

    pub fn depot_path(&self) -> &str {
        &self.depot_path
    }
}

/// Lifecycle of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkState {
    Queued,
    Dispatched,
    Succeeded,
    Failed,
}

/// Cumulative per-state counters shared by the queue and the pool.
#[derive(Debug, Default)]
pub struct PoolStats {
    queued: AtomicU64,
    dispatched: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`PoolStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub queued: u64,
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl StatsSnapshot {
    /// Items that reached a terminal state.
    pub fn finished(&self) -> u64 {
        self.succeeded + self.failed
    }
}

impl PoolStats {
    fn record(&self, state: WorkState) {
        let counter = match state {
            WorkState::Queued => &self.queued,
            WorkState::Dispatched => &self.dispatched,
            WorkState::Succeeded => &self.succeeded,
            WorkState::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            queued: self.queued.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Producer side of the work queue. Cheap to clone.
#[derive(Clone)]
pub struct WorkQueue {
    sender: mpsc::UnboundedSender<WorkItem>,
    stats: Arc<PoolStats>,
}

/// Consumer side of the work queue, handed to [`WorkerPool::run`].
pub struct WorkReceiver {
    receiver: mpsc::UnboundedReceiver<WorkItem>,
    stats: Arc<PoolStats>,
}

/// Create a connected queue/receiver pair.
pub fn work_queue() -> (WorkQueue, WorkReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let stats = Arc::new(PoolStats::default());
    (
        WorkQueue {
            sender,
            stats: Arc::clone(&stats),
        },
        WorkReceiver { receiver, stats },
    )
}

impl WorkQueue {
    /// Enqueue an item without waiting. Returns false if the pool is gone.
    pub fn enqueue(&self, item: WorkItem) -> bool {
        match self.sender.send(item) {
            Ok(()) => {
                self.stats.record(WorkState::Queued);
                true
            }
            Err(mpsc::error::SendError(item)) => {
                tracing::error!("Work queue closed, dropping {}", item.depot_path());
                false
            }
        }
    }

    pub fn stats(&self) -> Arc<PoolStats> {
        Arc::clone(&self.stats)
    }
}

impl WorkReceiver {
    pub fn stats(&self) -> Arc<PoolStats> {
        Arc::clone(&self.stats)
    }
}

/// Runs the full pipeline for one item.
#[async_trait]
pub trait WorkHandler: Send + Sync {
    async fn handle(&self, item: &WorkItem) -> PipelineResult<()>;
}

/// Fixed-size pool of concurrent workers.
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Dispatch items until every [`WorkQueue`] has been dropped.
    ///
    /// In-flight items keep running after this returns.
    pub async fn run(self, mut queue: WorkReceiver, handler: Arc<dyn WorkHandler>) {
        let permits = Arc::new(Semaphore::new(self.workers));
        tracing::info!("Worker pool started with {} workers", self.workers);

        while let Some(item) = queue.receiver.recv().await {
            let permits = Arc::clone(&permits);
            let handler = Arc::clone(&handler);
            let stats = Arc::clone(&queue.stats);

            tokio::spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    tracing::error!("Worker semaphore closed, dropping {}", item.depot_path());
                    stats.record(WorkState::Failed);
                    return;
                };

                stats.record(WorkState::Dispatched);
                let state = run_item(handler.as_ref(), &item).await;
                stats.record(state);
            });
        }

        tracing::warn!("Work queue closed, dispatcher stopping");
    }
}

/// Run one item, converting errors and panics into a terminal state.
async fn run_item(handler: &dyn WorkHandler, item: &WorkItem) -> WorkState {
    let path = item.depot_path();
    tracing::debug!("Dispatched {path}");

    match AssertUnwindSafe(handler.handle(item)).catch_unwind().await {
        Ok(Ok(())) => WorkState::Succeeded,
        Ok(Err(e)) => {
            tracing::error!("Error processing file: {path}. {e}");
            WorkState::Failed
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!("Worker panicked processing {path}: {message}");
            WorkState::Failed
        }
    }
}
