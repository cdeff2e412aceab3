//! The unit of work flowing from admission to a worker.

use std::time::Duration;

use a2v_core::JobId;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Opaque reference to the uploaded source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    /// Transport-specific file identifier.
    pub file_id: String,
    /// File name suggested by the sender; may be empty.
    pub file_name: String,
}

/// Where results and failure messages are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyTarget {
    pub chat_id: i64,
    /// The message being replied to.
    pub message_id: i64,
}

/// A conversion request admitted into the queue.
///
/// `cancel` ends when the context that admitted the job ends. A worker that
/// receives a job whose token is already cancelled drops it without running
/// any stage. `deadline` is fixed at submission and bounds every stage.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub cancel: CancellationToken,
    pub submitted_at: Instant,
    pub deadline: Instant,
    pub source: SourceRef,
    pub reply: ReplyTarget,
}

impl Job {
    /// Create a job whose deadline is `timeout` from now.
    ///
    /// `parent` is the execution context of the caller; the job receives a
    /// child token of it.
    pub fn new(
        parent: &CancellationToken,
        source: SourceRef,
        reply: ReplyTarget,
        timeout: Duration,
    ) -> Self {
        let submitted_at = Instant::now();
        Self {
            id: JobId::new(),
            cancel: parent.child_token(),
            submitted_at,
            deadline: submitted_at + timeout,
            source,
            reply,
        }
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}
