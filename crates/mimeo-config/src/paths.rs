//! Application and library paths.

use crate::config::LibraryConfig;
use directories::ProjectDirs;
use std::path::PathBuf;

/// Platform locations for the config file.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
}

impl AppPaths {
    /// Create paths using platform-specific directories.
    pub fn new() -> Option<Self> {
        let proj_dirs = ProjectDirs::from("com", "mimeo", "mimeo")?;
        let config_dir = proj_dirs.config_dir().to_path_buf();

        Some(Self {
            config_file: config_dir.join("config.toml"),
            config_dir,
        })
    }
}

/// Resolved locations of every content root and persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryPaths {
    pub documents_dir: PathBuf,
    pub videos_dir: PathBuf,
    pub urls_file: PathBuf,
    pub data_dir: PathBuf,
    /// Caption artifacts, one JSON file per video id.
    pub captions_dir: PathBuf,
    /// Creator profiles, one JSON file per creator.
    pub profiles_dir: PathBuf,
    pub database_file: PathBuf,
    pub lock_file: PathBuf,
}

impl LibraryPaths {
    pub fn from_config(library: &LibraryConfig) -> Self {
        let data_dir = library.resolve(&library.data_dir);

        Self {
            documents_dir: library.resolve(&library.documents_dir),
            videos_dir: library.resolve(&library.videos_dir),
            urls_file: library.resolve(&library.urls_file),
            captions_dir: data_dir.join("youtube"),
            profiles_dir: data_dir.join("profiles"),
            database_file: data_dir.join("knowledge.db"),
            lock_file: data_dir.join("ingest.lock"),
            data_dir,
        }
    }

    /// Create every directory the pipeline writes into.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.captions_dir)?;
        std::fs::create_dir_all(&self.profiles_dir)?;
        Ok(())
    }
}
