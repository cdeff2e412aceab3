//! Texts shown to the requester.

use a2v_core::Error;

/// Source repository linked from the help text.
pub const REPO_URL: &str = "https://github.com/azhinu/audio2voice";

pub const PROCESSING: &str = "Processing…";
pub const OVERLOADED: &str = "Bot is overloaded. Please try again in a couple of minutes.";
pub const UNKNOWN_COMMAND: &str = "Unknown command. Just send an audio file.";
/// Plain hint for messages without usable audio.
pub const SEND_AUDIO_HINT: &str =
    "Send an audio file (mp3, m4a, ogg/vorbis) and I'll convert it to a voice message.";
pub const ACQUISITION_FAILED: &str =
    "Failed to download the file. Please try again. Files up to 20MB are supported.";
pub const CONVERSION_FAILED: &str = "Failed to convert the file to a voice message";
pub const TIMED_OUT: &str = "Conversion took too long and was cancelled. Please try a shorter file.";
pub const DELIVERY_FAILED: &str = "Could not send the voice message.";
/// For jobs dropped because the bot is stopping.
pub const SHUTTING_DOWN: &str = "The bot is restarting and your file was not converted. Please send it again in a minute.";

/// Longest encoder diagnostic shown to the requester, in characters.
pub const MAX_DIAGNOSTIC_CHARS: usize = 300;

/// Help text for `/start` and `/help`, formatted as HTML.
pub fn usage() -> String {
    format!("{SEND_AUDIO_HINT} Sources are available at <a href=\"{REPO_URL}\">GitHub</a>.")
}

/// The reply for a failed job or admission, if the requester should see one.
///
/// Probe failures are silent.
pub fn failure_message(err: &Error) -> Option<String> {
    match err {
        Error::Overloaded | Error::ShuttingDown => Some(OVERLOADED.to_string()),
        Error::Acquisition(_) => Some(ACQUISITION_FAILED.to_string()),
        Error::Conversion(diagnostic) => Some(format!(
            "{CONVERSION_FAILED}: {}",
            diagnostic_tail(diagnostic)
        )),
        Error::Timeout { .. } => Some(TIMED_OUT.to_string()),
        Error::Cancelled => Some(SHUTTING_DOWN.to_string()),
        Error::Delivery(_) => Some(DELIVERY_FAILED.to_string()),
        _ => None,
    }
}

/// The last [`MAX_DIAGNOSTIC_CHARS`] characters of `diagnostic`, marked with
/// a leading ellipsis when cut. ffmpeg prints the actual error last.
fn diagnostic_tail(diagnostic: &str) -> String {
    let diagnostic = diagnostic.trim();
    let total = diagnostic.chars().count();
    if total <= MAX_DIAGNOSTIC_CHARS {
        return diagnostic.to_string();
    }
    let tail: String = diagnostic.chars().skip(total - MAX_DIAGNOSTIC_CHARS).collect();
    format!("…{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2v_core::Stage;

    #[test]
    fn conversion_includes_diagnostic() {
        let msg = failure_message(&Error::Conversion("ffmpeg: invalid data".into())).unwrap();
        assert_eq!(
            msg,
            "Failed to convert the file to a voice message: ffmpeg: invalid data"
        );
    }

    #[test]
    fn stage_messages() {
        assert_eq!(
            failure_message(&Error::Acquisition("404".into())).as_deref(),
            Some(ACQUISITION_FAILED)
        );
        assert_eq!(
            failure_message(&Error::Timeout {
                stage: Stage::Transcode
            })
            .as_deref(),
            Some(TIMED_OUT)
        );
        assert_eq!(
            failure_message(&Error::Cancelled).as_deref(),
            Some(SHUTTING_DOWN)
        );
        assert_eq!(
            failure_message(&Error::Delivery("x".into())).as_deref(),
            Some(DELIVERY_FAILED)
        );
        assert_eq!(failure_message(&Error::Overloaded).as_deref(), Some(OVERLOADED));
    }

    #[test]
    fn long_diagnostic_keeps_its_end() {
        let banner = "ffmpeg version 6.1 Copyright (c) 2000-2023 ".repeat(200);
        let diagnostic = format!("ffmpeg: exited with code 1: {banner}input.mp3: Invalid data found when processing input");

        let msg = failure_message(&Error::Conversion(diagnostic)).unwrap();

        assert!(msg.starts_with("Failed to convert the file to a voice message: …"));
        assert!(msg.ends_with("Invalid data found when processing input"));
        assert!(msg.chars().count() <= CONVERSION_FAILED.len() + 3 + MAX_DIAGNOSTIC_CHARS);
        assert!(msg.chars().count() < 4096);
    }

    #[test]
    fn multibyte_diagnostic_is_cut_on_char_boundary() {
        let diagnostic = "é".repeat(MAX_DIAGNOSTIC_CHARS + 10);
        let msg = failure_message(&Error::Conversion(diagnostic)).unwrap();
        assert!(msg.ends_with(&"é".repeat(MAX_DIAGNOSTIC_CHARS)));
    }

    #[test]
    fn probe_failure_is_silent() {
        assert_eq!(failure_message(&Error::Probe("duration not found".into())), None);
    }

    #[test]
    fn usage_links_repository() {
        assert!(usage().contains(&format!("<a href=\"{REPO_URL}\">GitHub</a>")));
    }
}
