//! Mimeo Process - Media processing for recordings.
//!
//! This crate provides:
//! - Audio extraction to compact mono MP3 (via FFmpeg CLI)
//! - Speech transcription (via Whisper CLI)
//!
//! These rely on external tools being installed on the system.

mod error;
mod ffmpeg;
mod transcribe;

pub use error::{ProcessError, ProcessResult};
pub use ffmpeg::{audio_extraction_args, extract_audio};
pub use transcribe::{segments_to_text, transcribe_audio, Transcription, TranscriptSegment};

/// Check which external tools are available.
pub fn check_dependencies() -> Vec<(&'static str, bool)> {
    vec![
        ("ffmpeg", which::which("ffmpeg").is_ok()),
        ("whisper", which::which("whisper").is_ok()),
    ]
}
