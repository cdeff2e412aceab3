//! Encode an audio file into a mono 48 kHz Opus voice note.

use std::path::Path;

use tokio::time::Instant;

use crate::runner::ProcessRunner;

/// ffmpeg arguments producing an Ogg/Opus voice file: video stripped, mono,
/// 48 000 Hz, existing output overwritten.
pub fn voice_encode_args(input: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
        "-vn".into(),
        "-ac".into(),
        "1".into(),
        "-ar".into(),
        "48000".into(),
        "-c:a".into(),
        "libopus".into(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Transcode `input` into `output` with ffmpeg.
pub async fn encode_voice(
    runner: &dyn ProcessRunner,
    ffmpeg: &Path,
    input: &Path,
    output: &Path,
    deadline: Instant,
) -> a2v_core::Result<()> {
    tracing::debug!(input = %input.display(), output = %output.display(), "Encoding voice");
    runner
        .run(ffmpeg, &voice_encode_args(input, output), deadline)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_are_exact() {
        let args = voice_encode_args(Path::new("/w/input.mp3"), Path::new("/w/voice.ogg"));
        assert_eq!(
            args.join(" "),
            "-y -i /w/input.mp3 -vn -ac 1 -ar 48000 -c:a libopus /w/voice.ogg"
        );
    }

    #[test]
    fn paths_with_spaces_stay_single_arguments() {
        let args = voice_encode_args(Path::new("/w/my song.m4a"), Path::new("/w/voice.ogg"));
        assert_eq!(args[2], "/w/my song.m4a");
        assert_eq!(args.len(), 11);
    }
}
