//! # a2v-av
//!
//! External tool management and audio processing for audio2voice.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and ffprobe.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout and
//!   deadline support for running external processes.
//! - **Process port** ([`ProcessRunner`]) -- the seam pipeline stages use to
//!   run tools, with [`ToolRunner`] as the real implementation.
//! - **Workspace management** ([`Workspace`]) -- per-job temporary directory.
//! - **Voice encoding and duration probing** ([`actions::encode_voice`],
//!   [`probe::probe_duration`]).

pub mod actions;
pub mod command;
pub mod probe;
pub mod runner;
pub mod tools;
pub mod workspace;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use runner::{ProcessRunner, ToolRunner};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
pub use workspace::Workspace;

pub use actions::{encode_voice, voice_encode_args};
pub use probe::{duration_probe_args, parse_duration_secs, probe_duration};
