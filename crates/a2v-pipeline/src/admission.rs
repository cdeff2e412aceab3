//! Non-blocking front door to the worker pool.

use std::sync::Arc;
use std::time::Duration;

use a2v_core::Error;
use tokio_util::sync::CancellationToken;

use crate::job::{Job, ReplyTarget, SourceRef};
use crate::pool::WorkerPoolManager;

/// Admits jobs into the pool generation bound to `context`.
///
/// The full-queue rejection in [`submit`](Self::submit) is the only
/// backpressure mechanism; callers are never made to wait.
#[derive(Clone)]
pub struct JobAdmission {
    pool: Arc<WorkerPoolManager>,
    context: CancellationToken,
    job_timeout: Duration,
}

impl JobAdmission {
    pub fn new(pool: Arc<WorkerPoolManager>, context: CancellationToken, job_timeout: Duration) -> Self {
        Self {
            pool,
            context,
            job_timeout,
        }
    }

    /// Build a job tied to this admission's context, with its deadline
    /// starting now.
    pub fn new_job(&self, source: SourceRef, reply: ReplyTarget) -> Job {
        Job::new(&self.context, source, reply, self.job_timeout)
    }

    /// Make one enqueue attempt.
    ///
    /// Returns [`Error::Overloaded`] if the queue is full and
    /// [`Error::ShuttingDown`] if the context has ended. A rejected job is
    /// dropped.
    pub fn submit(&self, job: Job) -> a2v_core::Result<()> {
        if self.context.is_cancelled() {
            return Err(Error::ShuttingDown);
        }

        let job_id = job.id;
        let queue = self.pool.ensure_workers(&self.context);
        match queue.try_enqueue(job) {
            Ok(()) => {
                tracing::debug!(
                    job_id = %job_id,
                    generation = queue.generation(),
                    pending = queue.pending(),
                    "Job admitted"
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!(job_id = %job_id, generation = queue.generation(), error = %e, "Job rejected");
                Err(e)
            }
        }
    }

    pub fn pool(&self) -> &Arc<WorkerPoolManager> {
        &self.pool
    }

    pub fn context(&self) -> &CancellationToken {
        &self.context
    }
}
