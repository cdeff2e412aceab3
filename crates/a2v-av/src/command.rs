//! Builder for executing external tool commands under a deadline.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use a2v_core::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// How long to wait for the output pipes to close after a kill.
const PIPE_GRACE: Duration = Duration::from_millis(500);

/// Output captured from a tool execution.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Process exit code, `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// A builder for constructing and executing external tool invocations.
///
/// The process is bounded by whichever comes first of the relative
/// [`timeout`](Self::timeout) and the absolute [`deadline`](Self::deadline).
/// When that point is reached the process is killed and reaped.
///
/// # Example
///
/// ```no_run
/// use a2v_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> a2v_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .args(["-v", "error", "-show_entries", "format=duration"])
///     .arg("/tmp/voice.ogg")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    deadline: Option<Instant>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            deadline: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Set an absolute point in time after which the process is killed.
    pub fn deadline(&mut self, at: Instant) -> &mut Self {
        self.deadline = Some(at);
        self
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - [`Error::Tool`] if spawning fails or the process exits with a
    ///   non-zero status (message includes the trimmed stderr, if any).
    /// - [`Error::ToolTimeout`] if the timeout or deadline is reached first.
    pub async fn execute(&self) -> a2v_core::Result<ToolOutput> {
        let program_name = self.program_name();
        let started = Instant::now();
        let limit = match self.deadline {
            Some(deadline) => deadline.min(started + self.timeout),
            None => started + self.timeout,
        };

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(tool = %program_name, args = ?self.args, "Spawning tool");

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        // Drain both pipes concurrently so a chatty process never blocks on a
        // full pipe and diagnostics survive a kill.
        let stdout = child.stdout.take().map(|out| tokio::spawn(drain(out)));
        let stderr = child.stderr.take().map(|err| tokio::spawn(drain(err)));

        match tokio::time::timeout_at(limit, child.wait()).await {
            Ok(Ok(status)) => {
                let output = ToolOutput {
                    exit_code: status.code(),
                    stdout: collect(stdout).await,
                    stderr: collect(stderr).await,
                };

                if !status.success() {
                    return Err(Error::tool(
                        program_name,
                        with_diagnostic(describe_exit(output.exit_code), &output.stderr),
                    ));
                }

                Ok(output)
            }
            Ok(Err(e)) => Err(Error::tool(
                program_name,
                format!("I/O error waiting for process: {e}"),
            )),
            Err(_elapsed) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(tool = %program_name, error = %e, "Failed to kill timed out process");
                }
                let stderr = collect(stderr).await;
                Err(Error::tool_timeout(
                    program_name,
                    with_diagnostic(
                        format!("killed after {:?}", started.elapsed()),
                        &stderr,
                    ),
                ))
            }
        }
    }
}

async fn drain<R: AsyncRead + Unpin>(mut reader: R) -> Vec<u8> {
    let mut buf = Vec::new();
    // A read error only truncates the captured text.
    let _ = reader.read_to_end(&mut buf).await;
    buf
}

async fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    let Some(handle) = handle else {
        return String::new();
    };
    match tokio::time::timeout(PIPE_GRACE, handle).await {
        Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).to_string(),
        _ => String::new(),
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with code {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Append trimmed diagnostic text to `message` when there is any.
fn with_diagnostic(message: String, stderr: &str) -> String {
    let diagnostic = stderr.trim();
    if diagnostic.is_empty() {
        message
    } else {
        format!("{message}: {diagnostic}")
    }
}
