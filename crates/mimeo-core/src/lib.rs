//! Mimeo Core - Core types and domain models for the Mimeo ingestion pipeline.

mod error;
mod profile;
mod types;

pub use error::{Error, Result};
pub use profile::{CreatorProfile, DimensionKey, StyleDimension, DIMENSIONS};
pub use types::*;
