//! Bounded job queue plus a fixed set of workers, tied to one execution
//! context at a time.
//!
//! A *generation* is one queue and the workers pulling from it. It moves
//! through [`PoolState::Absent`] → [`PoolState::Active`] →
//! [`PoolState::Draining`] → [`PoolState::Absent`]:
//!
//! - The first [`WorkerPoolManager::ensure_workers`] call creates it.
//! - When its parent context is cancelled the queue is closed. Workers finish
//!   the job they hold, drain what is buffered, then exit.
//! - Once every worker has exited the slot is cleared. A generation whose
//!   parent is cancelled is never handed out again, so the next
//!   `ensure_workers` call creates a fresh one.
//!
//! A fresh generation may start while the previous one is still draining.
//! The draining generation has a closed queue and only finishes jobs it
//! already holds, so at most one generation ever accepts jobs. Its watcher
//! clears the slot only if the slot still holds it.
//!
//! The slot holding the current generation is the only shared mutable state.
//! Its lock is held for the check-and-create step only, never across an
//! `.await`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use a2v_core::Error;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::job::Job;

/// What a worker does with each job it pulls.
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    /// Process one job. Failures are reported by the handler itself.
    async fn handle(&self, job: Job);
}

/// Lifecycle state of the current generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Absent,
    Active,
    Draining,
}

/// Sending side of one generation's queue.
#[derive(Debug, Clone)]
pub struct QueueHandle {
    generation: u64,
    sender: mpsc::Sender<Job>,
}

impl QueueHandle {
    /// Enqueue without waiting.
    ///
    /// Fails with [`Error::Overloaded`] when the queue is full and
    /// [`Error::ShuttingDown`] when the generation has closed. The job is
    /// dropped in both cases.
    pub fn try_enqueue(&self, job: Job) -> a2v_core::Result<()> {
        self.sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => Error::Overloaded,
            TrySendError::Closed(_) => Error::ShuttingDown,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether both handles feed the same queue.
    pub fn same_queue(&self, other: &QueueHandle) -> bool {
        self.sender.same_channel(&other.sender)
    }

    /// Number of jobs waiting in the queue.
    pub fn pending(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

struct Generation {
    id: u64,
    parent: CancellationToken,
    sender: mpsc::Sender<Job>,
    tracker: TaskTracker,
}

impl Generation {
    fn handle(&self) -> QueueHandle {
        QueueHandle {
            generation: self.id,
            sender: self.sender.clone(),
        }
    }
}

type Slot = Arc<Mutex<Option<Generation>>>;
type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>;

/// Owns the current generation and recreates it on demand.
pub struct WorkerPoolManager {
    current: Slot,
    handler: Arc<dyn JobHandler>,
    capacity: usize,
    workers: usize,
    next_generation: AtomicU64,
}

impl WorkerPoolManager {
    /// `capacity` and `workers` are raised to at least one.
    pub fn new(handler: Arc<dyn JobHandler>, capacity: usize, workers: usize) -> Self {
        Self {
            current: Arc::new(Mutex::new(None)),
            handler,
            capacity: capacity.max(1),
            workers: workers.max(1),
            next_generation: AtomicU64::new(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Return the queue of the active generation, creating one bound to
    /// `parent` if there is none.
    ///
    /// A generation whose parent is already cancelled counts as absent.
    /// Concurrent callers observe exactly one new queue.
    pub fn ensure_workers(&self, parent: &CancellationToken) -> QueueHandle {
        let mut slot = self.current.lock();
        if let Some(generation) = slot.as_ref() {
            if !generation.parent.is_cancelled() {
                return generation.handle();
            }
        }

        let generation = self.spawn_generation(parent.clone());
        let handle = generation.handle();
        *slot = Some(generation);
        handle
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PoolState {
        match self.current.lock().as_ref() {
            None => PoolState::Absent,
            Some(generation) if generation.parent.is_cancelled() => PoolState::Draining,
            Some(_) => PoolState::Active,
        }
    }

    /// Wait until every worker of the current generation has exited.
    ///
    /// Returns immediately when there is no generation. Only completes after
    /// the generation's parent context has been cancelled.
    pub async fn drained(&self) {
        let tracker = self.current.lock().as_ref().map(|g| g.tracker.clone());
        if let Some(tracker) = tracker {
            tracker.wait().await;
        }
    }

    fn spawn_generation(&self, parent: CancellationToken) -> Generation {
        let id = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.capacity);
        let receiver: SharedReceiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let tracker = TaskTracker::new();

        for index in 0..self.workers {
            tracker.spawn(run_worker(
                id,
                index,
                receiver.clone(),
                parent.clone(),
                self.handler.clone(),
            ));
        }
        tracker.close();

        tokio::spawn(watch_generation(
            id,
            self.current.clone(),
            receiver,
            parent.clone(),
            tracker.clone(),
        ));

        tracing::info!(
            generation = id,
            workers = self.workers,
            capacity = self.capacity,
            "Worker pool started"
        );

        Generation {
            id,
            parent,
            sender,
            tracker,
        }
    }
}

/// Pull jobs until the queue is closed and empty.
async fn run_worker(
    generation: u64,
    index: usize,
    receiver: SharedReceiver,
    parent: CancellationToken,
    handler: Arc<dyn JobHandler>,
) {
    tracing::debug!(generation, worker = index, "Worker started");

    while let Some(job) = next_job(&receiver, &parent).await {
        let job_id = job.id;
        let handler = handler.clone();
        // A panicking handler only loses its own job.
        if let Err(e) = tokio::spawn(async move { handler.handle(job).await }).await {
            tracing::error!(generation, worker = index, job_id = %job_id, error = %e, "Job handler panicked");
        }
    }

    tracing::debug!(generation, worker = index, "Worker exiting");
}

async fn next_job(receiver: &SharedReceiver, parent: &CancellationToken) -> Option<Job> {
    let mut rx = receiver.lock().await;
    if !parent.is_cancelled() {
        tokio::select! {
            job = rx.recv() => return job,
            _ = parent.cancelled() => {}
        }
    }
    // Parent ended: refuse new jobs, hand out what is already buffered.
    rx.close();
    rx.recv().await
}

/// Close the queue as soon as the parent ends, then clear the slot once the
/// workers are gone.
async fn watch_generation(
    generation: u64,
    slot: Slot,
    receiver: SharedReceiver,
    parent: CancellationToken,
    tracker: TaskTracker,
) {
    parent.cancelled().await;
    receiver.lock().await.close();
    tracing::info!(generation, "Worker pool draining");

    tracker.wait().await;

    let mut current = slot.lock();
    if current.as_ref().is_some_and(|g| g.id == generation) {
        *current = None;
    }
    drop(current);
    tracing::info!(generation, "Worker pool stopped");
}
