//! Error types for Ollama operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OllamaError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Model not found: {model}. Run 'ollama pull {model}' to download it.")]
    ModelNotFound { model: String },

    #[error("Ollama server is not running at {host}. Start it with 'ollama serve'.")]
    ServerNotRunning { host: String },

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OllamaError {
    /// Whether retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            OllamaError::Connection(_)
            | OllamaError::Timeout { .. }
            | OllamaError::ServerNotRunning { .. }
            | OllamaError::Http(_) => true,
            OllamaError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type OllamaResult<T> = Result<T, OllamaError>;
