//! Transcription and audio extraction through the local ffmpeg and whisper
//! command-line tools.

use crate::services::{AudioExtractor, ServiceResult, Transcriber};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct WhisperTranscriber {
    model: String,
}

impl WhisperTranscriber {
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into() }
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, media: &Path, language: &str) -> ServiceResult<String> {
        // whisper's JSON output is dropped with the scratch dir
        let scratch = tempfile::tempdir().map_err(mimeo_process::ProcessError::Io)?;
        let transcription = mimeo_process::transcribe_audio(media, &self.model, language, scratch.path())?;
        debug!(
            "Transcribed {} into {} segments",
            media.display(),
            transcription.segments.len()
        );
        Ok(transcription.text)
    }
}

#[derive(Default)]
pub struct FfmpegAudioExtractor;

impl FfmpegAudioExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl AudioExtractor for FfmpegAudioExtractor {
    fn extract_audio(&self, input: &Path, output_dir: &Path) -> ServiceResult<PathBuf> {
        Ok(mimeo_process::extract_audio(input, output_dir)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceFailure;

    #[test]
    fn test_missing_recording_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = FfmpegAudioExtractor::new()
            .extract_audio(&dir.path().join("absent.mp4"), dir.path())
            .unwrap_err();
        assert!(matches!(err, ServiceFailure::NotFound(_)));

        let err = WhisperTranscriber::new("base")
            .transcribe(&dir.path().join("absent.mp3"), "pt")
            .unwrap_err();
        assert!(matches!(err, ServiceFailure::NotFound(_)));
    }
}
