//! The [`ProcessRunner`] port and its subprocess-backed implementation.
//!
//! Pipeline stages never spawn processes directly; they go through this trait
//! so tests can substitute scripted runners.

use std::path::Path;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::command::{ToolCommand, ToolOutput};

/// Runs an external program to completion or until `deadline`.
///
/// Implementations must fail with [`a2v_core::Error::Tool`] on a non-zero
/// exit and [`a2v_core::Error::ToolTimeout`] when the deadline is reached,
/// carrying the trimmed diagnostic output when there is any.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        deadline: Instant,
    ) -> a2v_core::Result<ToolOutput>;
}

/// [`ProcessRunner`] that spawns real processes via [`ToolCommand`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolRunner;

#[async_trait]
impl ProcessRunner for ToolRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        deadline: Instant,
    ) -> a2v_core::Result<ToolOutput> {
        ToolCommand::new(program.to_path_buf())
            .args(args.iter().cloned())
            .deadline(deadline)
            .execute()
            .await
    }
}
