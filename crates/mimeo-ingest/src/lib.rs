//! Mimeo Ingest - turns creator content into knowledge items.
//!
//! This crate provides:
//! - Source adapters for documents, recordings and video captions
//! - Structural metadata and LLM classification
//! - Provenance ledgers so nothing is extracted twice
//! - An idempotent sink in front of the knowledge store
//! - Per-creator style profiles

pub mod adapters;
mod chunker;
pub mod enrich;
mod error;
pub mod ledger;
pub mod media;
pub mod metadata;
pub mod parsers;
pub mod pipeline;
pub mod profiles;
pub mod services;
pub mod sink;
pub mod store;
pub mod youtube;

pub use adapters::{BatchReport, ItemOutcome, SourceAdapter};
pub use chunker::{ChunkConfig, Chunker};
pub use error::{IngestError, IngestResult};
pub use pipeline::{BackgroundIngest, Pipeline, RunLock, Stage};
pub use sink::{CommitOutcome, IngestionSink};
pub use store::{KnowledgeStore, MemoryKnowledgeStore, SqliteKnowledgeStore};
