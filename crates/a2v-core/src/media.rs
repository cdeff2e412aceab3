//! Audio eligibility classification.
//!
//! Decides whether an inbound file is an acceptable audio source from its
//! file name and an optional MIME type hint. The extension check always wins;
//! the hint is only consulted when the extension is not recognised.

use std::path::Path;

/// File extensions (lowercase, without the dot) accepted as audio sources.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp3", "m4a", "aac", "ogg", "oga", "opus", "wav", "flac", "webm",
];

/// MIME types (lowercase) accepted as audio sources.
pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    "audio/mpeg",
    "audio/mp3",
    "audio/mp4",
    "audio/aac",
    "audio/x-m4a",
    "audio/ogg",
    "audio/vorbis",
    "application/ogg",
    "application/opus",
];

/// Outcome of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Ineligible,
}

impl Eligibility {
    pub fn is_eligible(self) -> bool {
        self == Eligibility::Eligible
    }
}

/// Classify a file as an acceptable audio source.
///
/// An empty hint counts as no hint, so an unknown extension without a hint is
/// always ineligible.
pub fn classify(file_name: &str, mime_hint: Option<&str>) -> Eligibility {
    if has_supported_extension(file_name) {
        return Eligibility::Eligible;
    }

    match mime_hint.map(str::trim) {
        Some(mime) if !mime.is_empty() && is_supported_mime(mime) => Eligibility::Eligible,
        _ => Eligibility::Ineligible,
    }
}

fn has_supported_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

fn is_supported_mime(mime: &str) -> bool {
    SUPPORTED_MIME_TYPES
        .iter()
        .any(|supported| mime.eq_ignore_ascii_case(supported))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_wins_regardless_of_hint() {
        for ext in SUPPORTED_EXTENSIONS {
            let lower = format!("track.{ext}");
            let upper = format!("track.{}", ext.to_uppercase());
            for name in [&lower, &upper] {
                assert!(classify(name, None).is_eligible(), "{name} without hint");
                assert!(classify(name, Some("")).is_eligible(), "{name} with empty hint");
                assert!(
                    classify(name, Some("text/plain")).is_eligible(),
                    "{name} with unrelated hint"
                );
            }
        }
    }

    #[test]
    fn mixed_case_extension() {
        assert_eq!(classify("track.MP3", Some("")), Eligibility::Eligible);
        assert_eq!(classify("Voice.OgA", None), Eligibility::Eligible);
    }

    #[test]
    fn mime_hint_rescues_unknown_extension() {
        for mime in SUPPORTED_MIME_TYPES {
            assert!(classify("unknown.bin", Some(mime)).is_eligible(), "{mime}");
            assert!(
                classify("no_extension", Some(&mime.to_uppercase())).is_eligible(),
                "{mime} uppercase"
            );
        }
    }

    #[test]
    fn neither_matches() {
        assert_eq!(classify("file.txt", Some("text/plain")), Eligibility::Ineligible);
        assert_eq!(classify("notes.pdf", Some("application/pdf")), Eligibility::Ineligible);
        assert_eq!(classify("video.mkv", None), Eligibility::Ineligible);
    }

    #[test]
    fn empty_hint_never_accepts() {
        assert_eq!(classify("unknown.bin", Some("")), Eligibility::Ineligible);
        assert_eq!(classify("unknown.bin", Some("   ")), Eligibility::Ineligible);
        assert_eq!(classify("", None), Eligibility::Ineligible);
    }

    #[test]
    fn extension_must_be_the_last_component() {
        assert_eq!(classify("mp3", None), Eligibility::Ineligible);
        assert_eq!(classify("track.mp3.exe", None), Eligibility::Ineligible);
    }
}
