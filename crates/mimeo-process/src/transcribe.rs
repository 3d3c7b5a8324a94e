//! Speech transcription using the Whisper CLI.

use crate::error::{ProcessError, ProcessResult};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

/// A segment of transcribed audio.
#[derive(Debug, Clone)]
pub struct TranscriptSegment {
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
}

/// Full result of one transcription.
#[derive(Debug, Clone)]
pub struct Transcription {
    pub text: String,
    pub segments: Vec<TranscriptSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperJsonOutput {
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    text: String,
    start: f64,
    end: f64,
}

/// Transcribe an audio or video file.
///
/// `language` is passed through as the recognition hint. Intermediate
/// output goes to `output_dir`.
pub fn transcribe_audio(
    audio_path: &Path,
    model: &str,
    language: &str,
    output_dir: &Path,
) -> ProcessResult<Transcription> {
    if !audio_path.exists() {
        return Err(ProcessError::FileNotFound(audio_path.to_path_buf()));
    }

    if which::which("whisper").is_err() {
        return Err(ProcessError::ToolNotFound {
            tool: "whisper".to_string(),
        });
    }

    info!(
        "Transcribing {:?} with model '{}' ({})",
        audio_path, model, language
    );

    let output = Command::new("whisper")
        .arg(audio_path)
        .args(["--model", model])
        .args(["--language", language])
        .args(["--output_format", "json"])
        .args(["--output_dir"])
        .arg(output_dir)
        .output()?;

    if !output.status.success() {
        return Err(ProcessError::TranscriptionError(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }

    let stem = audio_path.file_stem().and_then(|s| s.to_str()).unwrap_or("audio");
    let json_path = output_dir.join(format!("{}.json", stem));

    if !json_path.exists() {
        return Err(ProcessError::TranscriptionError(
            "Whisper output file not found".to_string(),
        ));
    }

    let json_content = std::fs::read_to_string(&json_path)?;
    let transcription = parse_whisper_output(&json_content)?;

    debug!("Transcribed {} segments", transcription.segments.len());
    Ok(transcription)
}

fn parse_whisper_output(json: &str) -> ProcessResult<Transcription> {
    let whisper_output: WhisperJsonOutput = serde_json::from_str(json)
        .map_err(|e| ProcessError::ParseError(format!("Failed to parse Whisper output: {}", e)))?;

    let segments: Vec<TranscriptSegment> = whisper_output
        .segments
        .into_iter()
        .map(|s| TranscriptSegment {
            text: s.text.trim().to_string(),
            start: s.start,
            end: s.end,
        })
        .collect();

    let text = match whisper_output.text.trim() {
        "" => segments_to_text(&segments),
        text => text.to_string(),
    };

    Ok(Transcription { text, segments })
}

/// Join segment texts with single spaces.
pub fn segments_to_text(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| s.text.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
