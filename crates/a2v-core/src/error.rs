//! Unified error type for audio2voice.
//!
//! All crates funnel their failures into [`Error`]. Job failures are
//! attributed to a pipeline [`Stage`] so the service can pick the reply the
//! requester sees, while the full error is only logged.

use std::fmt;

/// A step of the conversion pipeline that a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Resolving and downloading the source file.
    Acquire,
    /// Encoding the source into an Opus voice file.
    Transcode,
    /// Reading the duration of the encoded file.
    Probe,
    /// Sending the voice file back to the requester.
    Deliver,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Acquire => "acquire",
            Stage::Transcode => "transcode",
            Stage::Probe => "probe",
            Stage::Deliver => "deliver",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type covering all failure modes in audio2voice.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Admission rejected because the job queue is full.
    #[error("Conversion queue is full")]
    Overloaded,

    /// Admission rejected because the worker pool is closing.
    #[error("Conversion workers are shutting down")]
    ShuttingDown,

    /// The job's execution context ended before a worker picked it up.
    #[error("Job cancelled before processing started")]
    Cancelled,

    /// The source file could not be resolved or downloaded.
    #[error("Acquisition error: {0}")]
    Acquisition(String),

    /// The encoder failed; carries its diagnostic output.
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// The duration of the encoded file is unavailable.
    #[error("Probe error: {0}")]
    Probe(String),

    /// The finished voice file could not be sent.
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// The job deadline expired while a stage was running.
    #[error("Deadline exceeded during {stage} stage")]
    Timeout {
        /// The stage that was aborted.
        stage: Stage,
    },

    /// An external tool (ffmpeg, ffprobe) failed to run or exited non-zero.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Exit status and trimmed diagnostic output.
        message: String,
    },

    /// An external tool was killed because its deadline expired.
    #[error("Tool timed out [{tool}]: {message}")]
    ToolTimeout {
        /// Name of the tool that was killed.
        tool: String,
        /// Deadline description and any diagnostic output captured so far.
        message: String,
    },

    /// Configuration could not be loaded or is unusable.
    #[error("Config error: {0}")]
    Config(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An HTTP request to an external API failed.
    #[error("HTTP error: {source}")]
    Http {
        /// The underlying client error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// The pipeline stage this error is attributed to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Acquisition(_) => Some(Stage::Acquire),
            Error::Conversion(_) => Some(Stage::Transcode),
            Error::Probe(_) => Some(Stage::Probe),
            Error::Delivery(_) => Some(Stage::Deliver),
            Error::Timeout { stage } => Some(*stage),
            _ => None,
        }
    }

    /// Whether this error was caused by an expired deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. } | Error::ToolTimeout { .. })
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::ToolTimeout`].
    pub fn tool_timeout(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ToolTimeout {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Http`].
    pub fn http(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Http {
            source: source.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
