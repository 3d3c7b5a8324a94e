//! Wires adapters, services and the knowledge store into one run.

use crate::adapters::{
    BatchReport, CaptionAdapter, CaptionArtifact, DocumentAdapter, SourceAdapter, TranscriptAdapter,
    TranscriptArtifact,
};
use crate::chunker::{ChunkConfig, Chunker};
use crate::enrich::OllamaServices;
use crate::error::{IngestError, IngestResult};
use crate::ledger::{fs_partitions, FsLedger};
use crate::media::{FfmpegAudioExtractor, WhisperTranscriber};
use crate::profiles::ProfileAggregator;
use crate::services::Classifier;
use crate::sink::IngestionSink;
use crate::store::SqliteKnowledgeStore;
use crate::youtube::YoutubeCaptionSource;
use mimeo_config::Config;
use mimeo_core::CreatorProfile;
use mimeo_db::Database;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One step of a full run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Transcripts,
    Documents,
    Captions,
    Profiles,
}

impl Stage {
    /// Run order: profiles read the transcripts produced earlier.
    pub const ALL: [Stage; 4] = [Stage::Transcripts, Stage::Documents, Stage::Captions, Stage::Profiles];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Transcripts => "transcripts",
            Stage::Documents => "documents",
            Stage::Captions => "captions",
            Stage::Profiles => "profiles",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub struct Pipeline {
    transcripts: TranscriptAdapter,
    documents: DocumentAdapter,
    captions: CaptionAdapter,
    profiles: ProfileAggregator,
    lock_file: PathBuf,
}

impl Pipeline {
    pub fn new(
        transcripts: TranscriptAdapter,
        documents: DocumentAdapter,
        captions: CaptionAdapter,
        profiles: ProfileAggregator,
        lock_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transcripts,
            documents,
            captions,
            profiles,
            lock_file: lock_file.into(),
        }
    }

    /// Build the production pipeline: SQLite store, Ollama services,
    /// whisper and ffmpeg, YouTube captions.
    pub fn from_config(config: &Config) -> IngestResult<Self> {
        let paths = config.library_paths();
        paths.ensure_dirs()?;

        let services = OllamaServices::from_config(&config.ollama)?;
        if !services.is_available() {
            warn!(
                "Ollama is not reachable at {}; items will be tagged unclassified",
                config.ollama.host
            );
        }

        let db = Database::open(&paths.database_file)?;
        let chunker = Chunker::new(ChunkConfig::from_processing_config(&config.processing));
        let mut store = SqliteKnowledgeStore::new(db, chunker);
        if config.processing.embed {
            store = store.with_embedder(Box::new(services.embedder(&config.ollama.embedding_model)));
        }
        let sink = IngestionSink::new(Arc::new(store));

        let classifier: Arc<dyn Classifier> = Arc::new(
            services.classifier(&config.ollama.model, config.processing.classify_excerpt_chars),
        );

        // Transcript artifacts live beside their recordings
        let transcript_ledgers = fs_partitions::<TranscriptArtifact>(&paths.videos_dir);

        let transcripts = TranscriptAdapter::new(
            &paths.videos_dir,
            transcript_ledgers.clone(),
            Arc::new(WhisperTranscriber::new(&config.processing.whisper_model)),
            Arc::new(FfmpegAudioExtractor::new()),
            sink.clone(),
        )
        .with_language(&config.processing.transcription_language)
        .with_transcode_threshold(config.processing.transcode_threshold_bytes());

        let documents = DocumentAdapter::new(&paths.documents_dir, classifier.clone(), sink.clone());

        let captions = CaptionAdapter::new(
            &paths.urls_file,
            Arc::new(FsLedger::<CaptionArtifact>::new(&paths.captions_dir)),
            Arc::new(YoutubeCaptionSource::new(services.runtime())?),
            classifier,
            sink.clone(),
        )
        .with_languages(config.captions.languages.clone())
        .with_delay(Duration::from_millis(config.captions.request_delay_ms));

        let profiles = ProfileAggregator::new(
            &paths.videos_dir,
            transcript_ledgers,
            Arc::new(FsLedger::<CreatorProfile>::new(&paths.profiles_dir)),
            Arc::new(services.style_analyzer(&config.ollama.profile_model)),
            sink,
        );

        Ok(Self::new(transcripts, documents, captions, profiles, paths.lock_file))
    }

    /// Run a single stage under the run lock.
    pub fn run_stage(&self, stage: Stage, force_profiles: bool) -> IngestResult<BatchReport> {
        let _lock = RunLock::acquire(&self.lock_file)?;
        Ok(self.execute(stage, force_profiles))
    }

    pub fn run_transcripts(&self) -> IngestResult<BatchReport> {
        self.run_stage(Stage::Transcripts, false)
    }

    pub fn run_documents(&self) -> IngestResult<BatchReport> {
        self.run_stage(Stage::Documents, false)
    }

    pub fn run_captions(&self) -> IngestResult<BatchReport> {
        self.run_stage(Stage::Captions, false)
    }

    pub fn run_profiles(&self, force: bool) -> IngestResult<BatchReport> {
        self.run_stage(Stage::Profiles, force)
    }

    /// Run every stage in [`Stage::ALL`] order under one run lock.
    pub fn run_all(&self, force_profiles: bool) -> IngestResult<Vec<(Stage, BatchReport)>> {
        let _lock = RunLock::acquire(&self.lock_file)?;
        Ok(Stage::ALL
            .iter()
            .map(|stage| (*stage, self.execute(*stage, force_profiles)))
            .collect())
    }

    fn execute(&self, stage: Stage, force_profiles: bool) -> BatchReport {
        info!("Running {} stage", stage);
        let report = match stage {
            Stage::Transcripts => self.transcripts.run(),
            Stage::Documents => self.documents.run(),
            Stage::Captions => self.captions.run(),
            Stage::Profiles => self.profiles.run(force_profiles),
        };
        info!(
            "{}: {} committed, {} unchanged, {} skipped, {} failed",
            stage,
            report.committed.len(),
            report.unchanged.len(),
            report.skipped.len(),
            report.failed.len()
        );
        report
    }
}

/// Exclusive marker file held for the duration of a run.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(path: &Path) -> IngestResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(IngestError::RunInProgress(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", std::process::id())?;

        debug!("Acquired run lock {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to release run lock {}: {}", self.path.display(), e);
        }
    }
}

/// Runs at most one ingestion job on a worker thread.
#[derive(Debug, Clone, Default)]
pub struct BackgroundIngest {
    running: Arc<AtomicBool>,
}

struct RunningFlag(Arc<AtomicBool>);

impl Drop for RunningFlag {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl BackgroundIngest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start `job` on a worker thread unless one is already running.
    pub fn spawn<F, T>(&self, job: F) -> IngestResult<JoinHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(IngestError::AlreadyRunning);
        }

        // Cleared when the job ends, panics included
        let flag = RunningFlag(self.running.clone());
        let handle = std::thread::Builder::new()
            .name("mimeo-ingest".to_string())
            .spawn(move || {
                let _flag = flag;
                job()
            })?;
        Ok(handle)
    }
}
