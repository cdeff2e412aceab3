//! Shared fakes for pipeline integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use a2v_av::{ProcessRunner, ToolOutput, ToolRegistry};
use a2v_core::Error;
use a2v_pipeline::{
    ConversionPipeline, ConversionService, Job, Notifier, RemoteResource, ReplyTarget,
    ResourceFetcher, SourceRef, TextFormat,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub const TARGET: ReplyTarget = ReplyTarget {
    chat_id: 1001,
    message_id: 55,
};

/// What a scripted tool invocation does.
#[derive(Debug, Clone)]
pub enum Script {
    /// Exit 0 with this stdout.
    Succeed(String),
    /// Exit non-zero with this stderr.
    Fail(String),
    /// Never finish on its own.
    Hang,
}

/// A recorded tool invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

/// [`ProcessRunner`] that follows per-tool scripts instead of spawning.
///
/// A successful ffmpeg run creates its output file, like the real encoder.
pub struct ScriptedRunner {
    ffmpeg: Script,
    ffprobe: Script,
    pub calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new(ffmpeg: Script, ffprobe: Script) -> Self {
        Self {
            ffmpeg,
            ffprobe,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls_to(&self, program: &str) -> Vec<Invocation> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.program == program)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        deadline: Instant,
    ) -> a2v_core::Result<ToolOutput> {
        let name = program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.calls.lock().push(Invocation {
            program: name.clone(),
            args: args.to_vec(),
        });

        let script = if name == "ffmpeg" {
            &self.ffmpeg
        } else {
            &self.ffprobe
        };

        match script {
            Script::Succeed(stdout) => {
                if name == "ffmpeg" {
                    if let Some(out) = args.last() {
                        std::fs::write(out, b"OggS")?;
                    }
                }
                Ok(ToolOutput {
                    exit_code: Some(0),
                    stdout: stdout.clone(),
                    stderr: String::new(),
                })
            }
            Script::Fail(stderr) => Err(Error::tool(
                name,
                format!("exited with code 1: {}", stderr.trim()),
            )),
            Script::Hang => {
                tokio::time::sleep_until(deadline + Duration::from_secs(60)).await;
                Err(Error::tool_timeout(name, "killed"))
            }
        }
    }
}

/// [`ResourceFetcher`] that writes fixed bytes, or fails.
pub struct FakeFetcher {
    remote_path: String,
    fail: bool,
    pub fetched: Mutex<Vec<PathBuf>>,
}

impl FakeFetcher {
    pub fn new(remote_path: &str) -> Self {
        Self {
            remote_path: remote_path.to_string(),
            fail: false,
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("documents/file_1")
        }
    }

    pub fn fetched(&self) -> Vec<PathBuf> {
        self.fetched.lock().clone()
    }
}

#[async_trait]
impl ResourceFetcher for FakeFetcher {
    async fn resolve(&self, source: &SourceRef) -> a2v_core::Result<RemoteResource> {
        Ok(RemoteResource {
            location: format!("https://files.invalid/{}", self.remote_path),
            remote_path: self.remote_path.clone(),
            suggested_name: source.file_name.clone(),
        })
    }

    async fn fetch(
        &self,
        _resource: &RemoteResource,
        dest: &Path,
        _deadline: Instant,
    ) -> a2v_core::Result<()> {
        if self.fail {
            return Err(Error::Acquisition("download failed with status 404".into()));
        }
        std::fs::write(dest, b"ID3 fake audio")?;
        self.fetched.lock().push(dest.to_path_buf());
        Ok(())
    }
}

/// A voice message handed to the notifier.
#[derive(Debug, Clone)]
pub struct Delivered {
    pub path: PathBuf,
    pub duration_secs: u32,
    pub existed: bool,
}

/// [`Notifier`] that records everything it is asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    pub fail_delivery: bool,
    pub replies: Mutex<Vec<String>>,
    pub voices: Mutex<Vec<Delivered>>,
}

impl RecordingNotifier {
    pub fn replies(&self) -> Vec<String> {
        self.replies.lock().clone()
    }

    pub fn voices(&self) -> Vec<Delivered> {
        self.voices.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn reply(
        &self,
        target: ReplyTarget,
        text: &str,
        _format: Option<TextFormat>,
    ) -> a2v_core::Result<()> {
        assert_eq!(target, TARGET);
        self.replies.lock().push(text.to_string());
        Ok(())
    }

    async fn deliver_voice(
        &self,
        target: ReplyTarget,
        path: &Path,
        duration_secs: u32,
    ) -> a2v_core::Result<()> {
        assert_eq!(target, TARGET);
        self.voices.lock().push(Delivered {
            path: path.to_path_buf(),
            duration_secs,
            existed: path.exists(),
        });
        if self.fail_delivery {
            return Err(Error::http("sendVoice returned 400"));
        }
        Ok(())
    }
}

pub fn tools() -> Arc<ToolRegistry> {
    Arc::new(ToolRegistry::from_paths([
        ("ffmpeg", PathBuf::from("/fake/bin/ffmpeg")),
        ("ffprobe", PathBuf::from("/fake/bin/ffprobe")),
    ]))
}

pub fn job(file_name: &str, timeout: Duration) -> Job {
    job_in(&CancellationToken::new(), file_name, timeout)
}

pub fn job_in(parent: &CancellationToken, file_name: &str, timeout: Duration) -> Job {
    Job::new(
        parent,
        SourceRef {
            file_id: format!("file-{file_name}"),
            file_name: file_name.to_string(),
        },
        TARGET,
        timeout,
    )
}

/// Fakes wired into a service.
pub struct Harness {
    pub runner: Arc<ScriptedRunner>,
    pub fetcher: Arc<FakeFetcher>,
    pub notifier: Arc<RecordingNotifier>,
    pub service: ConversionService,
    pub work_dir: tempfile::TempDir,
}

impl Harness {
    pub fn new(runner: ScriptedRunner, fetcher: FakeFetcher, notifier: RecordingNotifier) -> Self {
        let runner = Arc::new(runner);
        let fetcher = Arc::new(fetcher);
        let notifier = Arc::new(notifier);
        let work_dir = tempfile::tempdir().unwrap();
        let pipeline = ConversionPipeline::new(fetcher.clone(), runner.clone(), tools())
            .with_work_dir(Some(work_dir.path().to_path_buf()));
        let service = ConversionService::new(pipeline, notifier.clone());
        Self {
            runner,
            fetcher,
            notifier,
            service,
            work_dir,
        }
    }

    /// Whether any job workspace is left behind.
    pub fn leftovers(&self) -> usize {
        std::fs::read_dir(self.work_dir.path()).unwrap().count()
    }
}
