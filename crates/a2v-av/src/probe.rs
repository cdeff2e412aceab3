//! Duration probe backed by the `ffprobe` CLI.
//!
//! Runs `ffprobe -v error -show_entries format=duration -of
//! default=noprint_wrappers=1:nokey=1 <file>`, which prints the container
//! duration as plain decimal seconds on a single line.

use std::path::Path;

use a2v_core::Error;
use tokio::time::Instant;

use crate::runner::ProcessRunner;

/// Arguments for reading the container duration of `file`.
pub fn duration_probe_args(file: &Path) -> Vec<String> {
    vec![
        "-v".into(),
        "error".into(),
        "-show_entries".into(),
        "format=duration".into(),
        "-of".into(),
        "default=noprint_wrappers=1:nokey=1".into(),
        file.to_string_lossy().into_owned(),
    ]
}

/// Parse ffprobe's duration output into whole seconds, truncating.
///
/// Empty output, `N/A`, negative or non-finite values are probe failures.
pub fn parse_duration_secs(stdout: &str) -> a2v_core::Result<u32> {
    let text = stdout.trim();
    if text.is_empty() {
        return Err(Error::Probe("duration not found in ffprobe output".into()));
    }

    let secs: f64 = text
        .parse()
        .map_err(|e| Error::Probe(format!("invalid duration '{text}': {e}")))?;

    if !secs.is_finite() || secs < 0.0 {
        return Err(Error::Probe(format!("invalid duration '{text}'")));
    }

    Ok(secs.trunc() as u32)
}

/// Read the duration of `file` in whole seconds.
pub async fn probe_duration(
    runner: &dyn ProcessRunner,
    ffprobe: &Path,
    file: &Path,
    deadline: Instant,
) -> a2v_core::Result<u32> {
    let output = runner
        .run(ffprobe, &duration_probe_args(file), deadline)
        .await?;
    parse_duration_secs(&output.stdout)
}
