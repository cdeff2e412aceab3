//! Conversion pipeline: acquire → transcode → probe, with cleanup.
//!
//! Every stage runs under the job deadline. The acquire stage is cut off at
//! the deadline itself. The tool stages rely on the [`ProcessRunner`]
//! enforcing it, so a killed process still returns its captured stderr; the
//! pipeline only steps in [`TOOL_GRACE`] later, for runners that overrun. A
//! failed stage aborts the rest and the error is attributed to it:
//!
//! - acquire failures become [`Error::Acquisition`],
//! - encoder failures become [`Error::Conversion`] carrying the diagnostic,
//! - an expired deadline becomes [`Error::Timeout`] naming the stage.
//!
//! Probe failures are not fatal; the duration falls back to zero.
//!
//! All files live in one [`Workspace`]. On failure it is removed before
//! `execute` returns; on success it is handed to the caller inside the
//! [`VoiceArtifact`].

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use a2v_av::{encode_voice, probe_duration, ProcessRunner, ToolRegistry, Workspace};
use a2v_core::{Error, JobId, Stage};
use tokio::time::Instant;

use crate::job::Job;
use crate::ports::{RemoteResource, ResourceFetcher};

/// Output file name inside the workspace.
const OUTPUT_FILE: &str = "voice.ogg";
/// Input file stem inside the workspace.
const INPUT_STEM: &str = "input";
/// Extension used when neither the remote path nor the name carries one.
const FALLBACK_EXTENSION: &str = "audio";
/// How long past the deadline a tool stage may take to kill its process and
/// collect diagnostics.
pub const TOOL_GRACE: Duration = Duration::from_secs(2);

/// Outcome of [`ConversionPipeline::execute`].
pub type ConversionResult = a2v_core::Result<VoiceArtifact>;

/// An encoded voice file ready for delivery.
///
/// Owns the job workspace; dropping the artifact or calling
/// [`cleanup`](Self::cleanup) removes every file the job created.
#[derive(Debug)]
pub struct VoiceArtifact {
    workspace: Workspace,
    path: PathBuf,
    duration_secs: u32,
}

impl VoiceArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Duration in whole seconds, zero if probing failed.
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    /// Directory holding the job's files.
    pub fn workspace_dir(&self) -> &Path {
        self.workspace.path()
    }

    /// Remove the workspace.
    pub fn cleanup(self) -> a2v_core::Result<()> {
        self.workspace.close()
    }
}

/// Runs the conversion stages for one job at a time.
#[derive(Clone)]
pub struct ConversionPipeline {
    fetcher: Arc<dyn ResourceFetcher>,
    runner: Arc<dyn ProcessRunner>,
    tools: Arc<ToolRegistry>,
    work_dir: Option<PathBuf>,
}

impl ConversionPipeline {
    pub fn new(
        fetcher: Arc<dyn ResourceFetcher>,
        runner: Arc<dyn ProcessRunner>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            fetcher,
            runner,
            tools,
            work_dir: None,
        }
    }

    /// Create job workspaces under `dir` instead of the system temp dir.
    pub fn with_work_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.work_dir = dir;
        self
    }

    /// Run every stage for `job`.
    pub async fn execute(&self, job: &Job) -> ConversionResult {
        let workspace = Workspace::new(self.work_dir.as_deref())
            .map_err(|e| Error::Acquisition(format!("workspace: {e}")))?;

        match self.run_stages(job, &workspace).await {
            Ok((path, duration_secs)) => Ok(VoiceArtifact {
                workspace,
                path,
                duration_secs,
            }),
            Err(e) => {
                discard(job.id, workspace);
                Err(e)
            }
        }
    }

    async fn run_stages(&self, job: &Job, workspace: &Workspace) -> a2v_core::Result<(PathBuf, u32)> {
        let input = self.acquire(job, workspace).await?;

        let output = workspace.temp_file(OUTPUT_FILE);
        self.transcode(job, &input, &output).await?;

        let duration = match self.probe(job, &output).await {
            Ok(secs) => secs,
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "Duration probe failed; sending without duration");
                0
            }
        };

        Ok((output, duration))
    }

    async fn acquire(&self, job: &Job, workspace: &Workspace) -> a2v_core::Result<PathBuf> {
        guarded(job, Stage::Acquire, job.deadline, async {
            let resource = self.fetcher.resolve(&job.source).await?;
            let input = workspace.temp_file(&input_file_name(&resource));
            tracing::debug!(
                job_id = %job.id,
                remote_path = %resource.remote_path,
                input = %input.display(),
                "Downloading source"
            );
            self.fetcher.fetch(&resource, &input, job.deadline).await?;
            Ok(input)
        })
        .await
    }

    async fn transcode(&self, job: &Job, input: &Path, output: &Path) -> a2v_core::Result<()> {
        guarded(job, Stage::Transcode, job.deadline + TOOL_GRACE, async {
            let ffmpeg = self.tools.ffmpeg()?;
            encode_voice(self.runner.as_ref(), ffmpeg, input, output, job.deadline).await
        })
        .await
    }

    async fn probe(&self, job: &Job, output: &Path) -> a2v_core::Result<u32> {
        guarded(job, Stage::Probe, job.deadline + TOOL_GRACE, async {
            let ffprobe = self.tools.ffprobe()?;
            probe_duration(self.runner.as_ref(), ffprobe, output, job.deadline).await
        })
        .await
    }
}

/// Run one stage, abandoning it at `limit`, and attribute its failure.
async fn guarded<T>(
    job: &Job,
    stage: Stage,
    limit: Instant,
    fut: impl Future<Output = a2v_core::Result<T>>,
) -> a2v_core::Result<T> {
    match tokio::time::timeout_at(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(attribute(stage, e)),
        Err(_elapsed) => {
            tracing::warn!(job_id = %job.id, stage = %stage, "Job deadline exceeded");
            Err(Error::Timeout { stage })
        }
    }
}

fn attribute(stage: Stage, err: Error) -> Error {
    if let Error::ToolTimeout { .. } = err {
        tracing::warn!(stage = %stage, error = %err, "Tool killed at job deadline");
        return Error::Timeout { stage };
    }
    if err.is_timeout() {
        return Error::Timeout { stage };
    }
    if err.stage() == Some(stage) {
        return err;
    }
    match (stage, err) {
        (Stage::Acquire, e) => Error::Acquisition(e.to_string()),
        (Stage::Transcode, Error::Tool { tool, message }) => {
            Error::Conversion(format!("{tool}: {message}"))
        }
        (Stage::Transcode, e) => Error::Conversion(e.to_string()),
        (Stage::Probe, e) => Error::Probe(e.to_string()),
        (Stage::Deliver, e) => Error::Delivery(e.to_string()),
    }
}

/// `input.<ext>` where the extension comes from the remote path, then the
/// suggested name, then the fallback.
fn input_file_name(resource: &RemoteResource) -> String {
    let ext = extension_of(&resource.remote_path)
        .or_else(|| extension_of(&resource.suggested_name))
        .unwrap_or(FALLBACK_EXTENSION);
    format!("{INPUT_STEM}.{ext}")
}

fn extension_of(name: &str) -> Option<&str> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
}

fn discard(job_id: JobId, workspace: Workspace) {
    let dir = workspace.path().to_path_buf();
    match workspace.close() {
        Ok(()) => tracing::debug!(job_id = %job_id, dir = %dir.display(), "Removed job workspace"),
        Err(e) => tracing::warn!(job_id = %job_id, error = %e, "Failed to remove job workspace"),
    }
}
