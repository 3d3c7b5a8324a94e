//! Configuration structures and loading.

use crate::error::{ConfigError, ConfigResult};
use crate::paths::{AppPaths, LibraryPaths};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub processing: ProcessingConfig,

    #[serde(default)]
    pub captions: CaptionsConfig,

    #[serde(default)]
    pub ui: UiConfig,
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> ConfigResult<Self> {
        let paths = AppPaths::new().ok_or(ConfigError::NoConfigDir)?;
        Self::load_from(&paths.config_file)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Create a default config file with comments.
    pub fn create_default_file(path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, Self::default_config_string())?;
        Ok(())
    }

    /// Reject values that would make a run meaningless.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.processing.classify_excerpt_chars == 0 {
            return Err(ConfigError::Invalid(
                "processing.classify_excerpt_chars must be greater than zero".to_string(),
            ));
        }
        if self.processing.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "processing.chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.captions.languages.is_empty() {
            return Err(ConfigError::Invalid(
                "captions.languages must list at least one language".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve content roots and data locations against the library root.
    pub fn library_paths(&self) -> LibraryPaths {
        LibraryPaths::from_config(&self.library)
    }

    /// Generate a default config file with helpful comments.
    pub fn default_config_string() -> String {
        r#"# Mimeo Configuration
# Ingestion pipeline for creator documents, recordings and captions

[library]
# Base directory; relative paths below are resolved against it
root = "."

# Documents (PDF/TXT), organised as <category>/<subcategory>/...
documents_dir = "documents"

# One sub-directory per creator holding their recordings
videos_dir = "videos"

# One video URL per line, '#' starts a comment
urls_file = "youtube_urls.txt"

# Caption artifacts, profiles, knowledge store and run lock live here
data_dir = "data"

[ollama]
host = "http://localhost:11434"

# Model used for document/caption classification
model = "llama3.1:8b"

# Model used for creator style analysis
profile_model = "llama3.1:8b"

# Model for generating embeddings
embedding_model = "nomic-embed-text"

# Request timeout in seconds
timeout_seconds = 300

[processing]
# Characters of raw text sent to the classifier
classify_excerpt_chars = 2000

# Recordings larger than this are reduced to a mono mp3 before transcription
transcode_threshold_mb = 24

# Language hint passed to the transcriber
transcription_language = "pt"

# Whisper model size: tiny, base, small, medium, large
whisper_model = "base"

# Text chunking for embeddings
chunk_size = 512               # Tokens per chunk
chunk_overlap = 50             # Overlap between chunks

# Embed chunks when committing
embed = true

[captions]
# Preferred caption languages, in priority order
languages = ["pt", "pt-BR", "en"]

# Pause between caption downloads
request_delay_ms = 1000

[ui]
# Enable colored output
color = true
"#
        .to_string()
    }
}

/// Content roots and data directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub root: String,
    pub documents_dir: String,
    pub videos_dir: String,
    pub urls_file: String,
    pub data_dir: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            documents_dir: "documents".to_string(),
            videos_dir: "videos".to_string(),
            urls_file: "youtube_urls.txt".to_string(),
            data_dir: "data".to_string(),
        }
    }
}

impl LibraryConfig {
    /// Expand `~` and resolve `value` against the library root.
    pub fn resolve(&self, value: &str) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(value).as_ref());
        if expanded.is_absolute() {
            expanded
        } else {
            PathBuf::from(shellexpand::tilde(&self.root).as_ref()).join(expanded)
        }
    }
}

/// Ollama LLM settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub host: String,
    pub model: String,
    pub profile_model: String,
    pub embedding_model: String,
    pub timeout_seconds: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            model: "llama3.1:8b".to_string(),
            profile_model: "llama3.1:8b".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            timeout_seconds: 300,
        }
    }
}

/// Content processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub classify_excerpt_chars: usize,
    pub transcode_threshold_mb: u64,
    pub transcription_language: String,
    pub whisper_model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embed: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            classify_excerpt_chars: 2000,
            transcode_threshold_mb: 24,
            transcription_language: "pt".to_string(),
            whisper_model: "base".to_string(),
            chunk_size: 512,
            chunk_overlap: 50,
            embed: true,
        }
    }
}

impl ProcessingConfig {
    pub fn transcode_threshold_bytes(&self) -> u64 {
        self.transcode_threshold_mb * 1024 * 1024
    }
}

/// Caption download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionsConfig {
    pub languages: Vec<String>,
    pub request_delay_ms: u64,
}

impl Default for CaptionsConfig {
    fn default() -> Self {
        Self {
            languages: vec!["pt".to_string(), "pt-BR".to_string(), "en".to_string()],
            request_delay_ms: 1000,
        }
    }
}

/// UI/Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub color: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ollama.host, "http://localhost:11434");
        assert_eq!(config.processing.classify_excerpt_chars, 2000);
        assert_eq!(config.captions.languages, vec!["pt", "pt-BR", "en"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_string_parses_to_defaults() {
        let parsed: Config = toml::from_str(&Config::default_config_string()).unwrap();
        let defaults = Config::default();

        assert_eq!(parsed.library.videos_dir, defaults.library.videos_dir);
        assert_eq!(parsed.processing.transcode_threshold_mb, defaults.processing.transcode_threshold_mb);
        assert_eq!(parsed.captions.request_delay_ms, defaults.captions.request_delay_ms);
    }

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
            [processing]
            classify_excerpt_chars = 500

            [captions]
            languages = ["en"]
            "#
        )
        .unwrap();

        let config = Config::load_from(temp_file.path()).unwrap();

        assert_eq!(config.processing.classify_excerpt_chars, 500);
        assert_eq!(config.captions.languages, vec!["en"]);
        // Defaults should still work
        assert_eq!(config.processing.transcription_language, "pt");
        assert_eq!(config.ollama.embedding_model, "nomic-embed-text");
    }

    #[test]
    fn test_load_rejects_empty_languages() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[captions]\nlanguages = []").unwrap();

        let err = Config::load_from(temp_file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.library.data_dir, "data");
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.library.root = "/srv/library".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.library.root, "/srv/library");
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let library = LibraryConfig {
            root: "/srv/library".to_string(),
            ..Default::default()
        };

        assert_eq!(library.resolve("videos"), PathBuf::from("/srv/library/videos"));
        assert_eq!(library.resolve("/mnt/media"), PathBuf::from("/mnt/media"));
    }

    #[test]
    fn test_transcode_threshold_bytes() {
        let processing = ProcessingConfig::default();
        assert_eq!(processing.transcode_threshold_bytes(), 24 * 1024 * 1024);
    }
}
