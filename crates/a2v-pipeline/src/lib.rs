//! # a2v-pipeline
//!
//! Job admission and conversion for audio2voice.
//!
//! This crate provides:
//!
//! - **[`Job`]** -- one admitted conversion request with its deadline.
//! - **Ports** ([`Notifier`], [`ResourceFetcher`]) -- what the transport
//!   layer must implement.
//! - **[`ConversionPipeline`]** -- acquire, transcode and probe under the job
//!   deadline, with per-stage error attribution and workspace cleanup.
//! - **[`WorkerPoolManager`]** -- bounded queue and workers bound to one
//!   cancellable context, recreated after that context ends.
//! - **[`JobAdmission`]** -- non-blocking submit that rejects on overload.
//! - **[`ConversionService`]** -- the [`JobHandler`] that runs the pipeline,
//!   delivers the result and replies on failure.

pub mod admission;
pub mod job;
pub mod messages;
pub mod pipeline;
pub mod pool;
pub mod ports;
pub mod service;

// Re-export key types at the crate root.
pub use admission::JobAdmission;
pub use job::{Job, ReplyTarget, SourceRef};
pub use pipeline::{ConversionPipeline, ConversionResult, VoiceArtifact};
pub use pool::{JobHandler, PoolState, QueueHandle, WorkerPoolManager};
pub use ports::{Notifier, RemoteResource, ResourceFetcher, TextFormat};
pub use service::ConversionService;
