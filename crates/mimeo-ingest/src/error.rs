//! Error types for the ingestion pipeline.

use crate::services::ServiceFailure;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that can occur during ingestion.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] mimeo_db::DbError),

    #[error("Config error: {0}")]
    Config(#[from] mimeo_config::ConfigError),

    #[error("Processing error: {0}")]
    Process(#[from] mimeo_process::ProcessError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Parse error for {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("{0}")]
    Service(#[from] ServiceFailure),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Another ingestion run holds {0}")]
    RunInProgress(PathBuf),

    #[error("A background ingestion is already running")]
    AlreadyRunning,

    #[error("Knowledge store error: {0}")]
    Store(String),
}

impl From<mimeo_core::Error> for IngestError {
    fn from(e: mimeo_core::Error) -> Self {
        match e {
            mimeo_core::Error::Io(e) => IngestError::Io(e),
            other => IngestError::Store(other.to_string()),
        }
    }
}
