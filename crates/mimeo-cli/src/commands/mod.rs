//! CLI command implementations.

pub mod config;
pub mod ingest;
pub mod init;
pub mod status;

use anyhow::{Context, Result};
use mimeo_config::{AppPaths, Config};
use std::path::{Path, PathBuf};

/// The config file to use: `--config` if given, else the platform default.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(AppPaths::new()
            .context("Failed to determine application directories")?
            .config_file),
    }
}

/// Load configuration, falling back to defaults when the file is absent.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = config_path(explicit)?;
    Config::load_from(&path).with_context(|| format!("Failed to load config {}", path.display()))
}

/// Format a file size in human-readable form.
pub fn format_size(bytes: i64) -> String {
    const KB: i64 = 1024;
    const MB: i64 = KB * 1024;
    const GB: i64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
