//! Collaborator traits the pipeline and service are written against.
//!
//! The transport layer implements both: [`ResourceFetcher`] to pull the
//! uploaded file and [`Notifier`] to talk back to the requester.

use std::path::Path;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::job::{ReplyTarget, SourceRef};

/// Formatting hint for text replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Html,
}

/// Sends replies and finished voice messages to the requester.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a text reply to `target`.
    async fn reply(
        &self,
        target: ReplyTarget,
        text: &str,
        format: Option<TextFormat>,
    ) -> a2v_core::Result<()>;

    /// Send the voice file at `path` as a reply to `target`.
    async fn deliver_voice(
        &self,
        target: ReplyTarget,
        path: &Path,
        duration_secs: u32,
    ) -> a2v_core::Result<()>;
}

/// A source file resolved to a downloadable location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResource {
    /// Full download location. May embed credentials; never log it.
    pub location: String,
    /// Path of the file on the remote side, used for its extension.
    pub remote_path: String,
    /// File name suggested by the sender.
    pub suggested_name: String,
}

/// Resolves source references and downloads their bytes.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn resolve(&self, source: &SourceRef) -> a2v_core::Result<RemoteResource>;

    /// Download `resource` into `dest`, giving up at `deadline`.
    async fn fetch(
        &self,
        resource: &RemoteResource,
        dest: &Path,
        deadline: Instant,
    ) -> a2v_core::Result<()>;
}
