//! Boundaries to the external services the pipeline calls.
//!
//! Every call returns a [`ServiceResult`]; the calling adapter decides
//! whether a failure means "use defaults" or "skip this item".

use mimeo_core::{Classification, CreatorProfile};
use mimeo_ollama::OllamaError;
use mimeo_process::ProcessError;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Why an external call produced no usable value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceFailure {
    /// Transport error, timeout, or an unavailable tool/server.
    #[error("service unavailable: {0}")]
    Transient(String),

    /// The service answered but the answer could not be used.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The requested resource does not exist upstream.
    #[error("not found: {0}")]
    NotFound(String),
}

pub type ServiceResult<T> = Result<T, ServiceFailure>;

impl From<OllamaError> for ServiceFailure {
    fn from(e: OllamaError) -> Self {
        match e {
            OllamaError::ModelNotFound { .. } => ServiceFailure::NotFound(e.to_string()),
            ref err if err.is_transient() => ServiceFailure::Transient(e.to_string()),
            _ => ServiceFailure::MalformedResponse(e.to_string()),
        }
    }
}

impl From<ProcessError> for ServiceFailure {
    fn from(e: ProcessError) -> Self {
        match e {
            ProcessError::ParseError(_) => ServiceFailure::MalformedResponse(e.to_string()),
            ProcessError::FileNotFound(_) => ServiceFailure::NotFound(e.to_string()),
            _ => ServiceFailure::Transient(e.to_string()),
        }
    }
}

/// Tags a bounded excerpt of raw text with topic, author and keywords.
pub trait Classifier: Send + Sync {
    fn classify(&self, text: &str) -> ServiceResult<Classification>;
}

/// Whether a classification came from the service or from defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationStatus {
    Classified,
    Unclassified,
}

impl ClassificationStatus {
    /// Value stored under the `classification` metadata key.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationStatus::Classified => "llm",
            ClassificationStatus::Unclassified => "unclassified",
        }
    }
}

/// Classify `text`, substituting default tags on empty input or failure.
///
/// Never fails: a classifier error is logged and the item continues with
/// degraded metadata.
pub fn classify_or_default(
    classifier: &dyn Classifier,
    text: &str,
) -> (Classification, ClassificationStatus) {
    if text.trim().is_empty() {
        return (Classification::default(), ClassificationStatus::Unclassified);
    }

    match classifier.classify(text) {
        Ok(classification) => (classification, ClassificationStatus::Classified),
        Err(e) => {
            warn!("Classification failed, using defaults: {}", e);
            (Classification::default(), ClassificationStatus::Unclassified)
        }
    }
}

/// Speech-to-text over an audio or video file.
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, media: &Path, language: &str) -> ServiceResult<String>;
}

/// Produces a compact audio-only rendition of a recording.
pub trait AudioExtractor: Send + Sync {
    fn extract_audio(&self, input: &Path, output_dir: &Path) -> ServiceResult<PathBuf>;
}

/// One caption track a video exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrack {
    /// BCP-47-ish code as the platform reports it, e.g. `pt-BR`.
    pub language_code: String,
    /// Human-readable language name.
    pub language: String,
    /// Where to download the track from.
    pub url: String,
    /// Speech-recognition track rather than an uploaded one.
    pub generated: bool,
}

/// Remote source of caption tracks.
pub trait CaptionSource: Send + Sync {
    /// Tracks available for `video_id`, in the order the platform lists them.
    fn list_tracks(&self, video_id: &str) -> ServiceResult<Vec<CaptionTrack>>;

    /// Text fragments of one track, in playback order.
    fn fetch_track(&self, track: &CaptionTrack) -> ServiceResult<Vec<String>>;
}

/// Derives a ten-dimension style profile from a creator's transcripts.
pub trait StyleAnalyzer: Send + Sync {
    fn analyze(&self, creator: &str, transcripts: &str) -> ServiceResult<CreatorProfile>;
}

/// Maps text to an embedding vector.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> ServiceResult<Vec<f32>>;

    /// Name recorded next to each stored vector.
    fn model(&self) -> &str;
}
