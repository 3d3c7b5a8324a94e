//! Mimeo Config - Configuration management for Mimeo.

mod config;
mod error;
mod paths;

pub use config::*;
pub use error::{ConfigError, ConfigResult};
pub use paths::{AppPaths, LibraryPaths};
