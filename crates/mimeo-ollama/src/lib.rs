//! Mimeo Ollama - async client for a local Ollama server.
//!
//! Covers the two endpoints the pipeline needs: `/api/generate` for
//! classification and style analysis, `/api/embeddings` for chunk vectors.

mod client;
mod error;
mod types;

pub use client::OllamaClient;
pub use error::{OllamaError, OllamaResult};
pub use types::*;
