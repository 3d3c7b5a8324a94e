//! FFmpeg integration for shrinking recordings before transcription.

use crate::error::{ProcessError, ProcessResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Arguments that turn `input` into a 64 kbit/s, 16 kHz mono MP3 at `output`.
pub fn audio_extraction_args(input: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-i".into(), input.into()];
    args.extend(
        [
            "-vn", // No video
            "-acodec", "libmp3lame",
            "-ab", "64k",
            "-ar", "16000", // 16kHz sample rate (good for Whisper)
            "-ac", "1",     // Mono
            "-y",
        ]
        .iter()
        .map(OsString::from),
    );
    args.push(output.into());
    args
}

/// Extract the audio track of a recording into `output_dir`.
///
/// Returns the path to the MP3 file.
pub fn extract_audio(input: &Path, output_dir: &Path) -> ProcessResult<PathBuf> {
    if !input.exists() {
        return Err(ProcessError::FileNotFound(input.to_path_buf()));
    }

    if which::which("ffmpeg").is_err() {
        return Err(ProcessError::ToolNotFound {
            tool: "ffmpeg".to_string(),
        });
    }

    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("audio");
    let audio_path = output_dir.join(format!("{}.mp3", stem));

    info!("Extracting audio from {:?} to {:?}", input, audio_path);

    let output = Command::new("ffmpeg")
        .args(audio_extraction_args(input, &audio_path))
        .output()?;

    if !output.status.success() {
        return Err(ProcessError::FfmpegError(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }

    debug!("Audio extracted successfully");
    Ok(audio_path)
}
