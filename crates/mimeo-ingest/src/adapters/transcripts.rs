//! Recordings grouped by creator, turned into transcripts.
//!
//! Layout: `<videos>/<creator>/<recording>`. Each transcript is recorded in
//! the creator's ledger under the recording stem before it is committed, so
//! a recording is transcribed at most once. With [`fs_partitions`] over the
//! videos root the artifact lands beside its recording as `<stem>.json`.
//!
//! [`fs_partitions`]: crate::ledger::fs_partitions

use super::{BatchReport, ItemOutcome, SourceAdapter};
use crate::error::{IngestError, IngestResult};
use crate::ledger::{Ledger, LedgerFactory};
use crate::services::{AudioExtractor, Transcriber};
use crate::sink::IngestionSink;
use mimeo_core::{keys, ItemKind, KnowledgeItem, Locator, MetadataBag, SourceItem};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Extensions treated as recordings.
pub const RECORDING_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm", "m4a", "mp3", "wav"];

const ARTIFACT_KIND: &str = "transcript";

/// Persisted transcript of one recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptArtifact {
    pub author: String,
    pub kind: String,
    pub original_file: String,
    pub transcript: String,
}

impl TranscriptArtifact {
    pub fn new(author: impl Into<String>, original_file: impl Into<String>, transcript: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            kind: ARTIFACT_KIND.to_string(),
            original_file: original_file.into(),
            transcript: transcript.into(),
        }
    }
}

pub struct TranscriptAdapter {
    root: PathBuf,
    ledgers: LedgerFactory<TranscriptArtifact>,
    transcriber: Arc<dyn Transcriber>,
    audio: Arc<dyn AudioExtractor>,
    sink: IngestionSink,
    language: String,
    transcode_threshold: u64,
}

impl TranscriptAdapter {
    pub fn new(
        root: impl Into<PathBuf>,
        ledgers: LedgerFactory<TranscriptArtifact>,
        transcriber: Arc<dyn Transcriber>,
        audio: Arc<dyn AudioExtractor>,
        sink: IngestionSink,
    ) -> Self {
        Self {
            root: root.into(),
            ledgers,
            transcriber,
            audio,
            sink,
            language: "pt".to_string(),
            transcode_threshold: 24 * 1024 * 1024,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Recordings larger than `bytes` are reduced to audio first.
    pub fn with_transcode_threshold(mut self, bytes: u64) -> Self {
        self.transcode_threshold = bytes;
        self
    }

    /// Creator directories, sorted by name.
    pub fn creators(&self) -> IngestResult<Vec<(String, PathBuf)>> {
        creator_dirs(&self.root)
    }

    /// Recordings in one creator's directory, sorted by file name.
    pub fn recordings(&self, creator: &str, dir: &Path) -> IngestResult<Vec<SourceItem>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && is_recording(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        Ok(paths
            .into_iter()
            .map(|p| SourceItem::file(ItemKind::Transcript, p).with_creator(creator))
            .collect())
    }

    fn transcribe(&self, recording: &Path) -> IngestResult<Result<String, String>> {
        let size = std::fs::metadata(recording)?.len();
        let scratch = tempfile::tempdir()?;

        let media = if size > self.transcode_threshold {
            info!(
                "{} is {} MB, extracting audio first",
                recording.display(),
                size / (1024 * 1024)
            );
            match self.audio.extract_audio(recording, scratch.path()) {
                Ok(audio) => audio,
                Err(e) => {
                    warn!("Audio extraction failed, transcribing original: {}", e);
                    recording.to_path_buf()
                }
            }
        } else {
            recording.to_path_buf()
        };

        Ok(self
            .transcriber
            .transcribe(&media, &self.language)
            .map_err(|e| format!("transcription failed: {}", e)))
    }

    fn submit(&self, creator: &str, stem: &str, artifact: &TranscriptArtifact) -> IngestResult<ItemOutcome> {
        let metadata = MetadataBag::for_kind(ItemKind::Transcript)
            .with(keys::AUTHOR, creator)
            .with(keys::FILE, format!("{}.json", stem));

        let item = KnowledgeItem::new(
            format!("{} - {}", creator, stem),
            artifact.transcript.clone(),
            metadata,
        );
        Ok(self.sink.commit(item)?.into())
    }
}

impl SourceAdapter for TranscriptAdapter {
    fn name(&self) -> &'static str {
        "transcripts"
    }

    fn discover(&self) -> IngestResult<Vec<SourceItem>> {
        let mut items = Vec::new();
        for (creator, dir) in self.creators()? {
            match self.recordings(&creator, &dir) {
                Ok(found) => items.extend(found),
                Err(e) => warn!("Cannot read creator directory {}: {}", dir.display(), e),
            }
        }
        Ok(items)
    }

    fn ingest(&self, item: &SourceItem) -> IngestResult<ItemOutcome> {
        let Locator::File(recording) = &item.locator else {
            return Err(IngestError::InvalidReference(item.locator.to_string()));
        };
        let creator = item
            .creator
            .as_deref()
            .ok_or_else(|| IngestError::InvalidReference(format!("{} has no creator", item.label())))?;
        let dir = recording
            .parent()
            .ok_or_else(|| IngestError::InvalidReference(recording.display().to_string()))?;
        let stem = file_stem(recording);
        let ledger = (self.ledgers)(creator);

        if let Some(artifact) = ledger.lookup(&stem)? {
            if artifact.transcript.trim().is_empty() {
                return Ok(ItemOutcome::skipped("recorded transcript is empty"));
            }
            debug!("Reusing transcript {}", ledger.location(&stem).display());
            return self.submit(creator, &stem, &artifact);
        }

        let legacy = dir.join(format!("{}.txt", stem));
        let text = if legacy.is_file() {
            debug!("Upgrading plain-text transcript {}", legacy.display());
            let text = std::fs::read_to_string(&legacy)?;
            if text.trim().is_empty() {
                return Ok(ItemOutcome::skipped("plain-text transcript is empty"));
            }
            text
        } else {
            info!("Transcribing {}", recording.display());
            match self.transcribe(recording)? {
                Ok(text) if text.trim().is_empty() => {
                    return Ok(ItemOutcome::skipped("transcriber returned no speech"))
                }
                Ok(text) => text,
                Err(reason) => return Ok(ItemOutcome::Skipped { reason }),
            }
        };

        let original_file = recording
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| stem.clone());
        let artifact = TranscriptArtifact::new(creator, original_file, text.trim());
        ledger.record(&stem, &artifact)?;

        self.submit(creator, &stem, &artifact)
    }

    /// Creators are independent segments: an unreadable directory or a
    /// failed artifact write stops that creator only.
    fn run(&self) -> BatchReport {
        let mut report = BatchReport::new();

        let creators = match self.creators() {
            Ok(creators) => creators,
            Err(e) => {
                report.fail(self.name(), e);
                return report;
            }
        };

        for (creator, dir) in creators {
            let items = match self.recordings(&creator, &dir) {
                Ok(items) => items,
                Err(e) => {
                    report.fail(creator.as_str(), e);
                    continue;
                }
            };

            let mut remaining = items.iter();
            while let Some(item) = remaining.next() {
                let label = format!("{}/{}", creator, item.label());
                match self.ingest(item) {
                    Err(IngestError::Io(e)) => {
                        report.fail(label, IngestError::Io(e));
                        for rest in remaining.by_ref() {
                            report.skip(
                                format!("{}/{}", creator, rest.label()),
                                "creator aborted after storage failure",
                            );
                        }
                    }
                    result => report.record(label, result),
                }
            }
        }

        report
    }
}

pub(crate) fn creator_dirs(root: &Path) -> IngestResult<Vec<(String, PathBuf)>> {
    if !root.is_dir() {
        warn!("Recordings root {} does not exist", root.display());
        return Ok(Vec::new());
    }

    let mut creators = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if !name.starts_with('.') {
                creators.push((name.to_string(), path.clone()));
            }
        }
    }
    creators.sort();
    Ok(creators)
}

fn is_recording(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| RECORDING_EXTENSIONS.iter().any(|r| r.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::{memory_partitions, FakeAudio, FakeTranscriber};
    use crate::ledger::{fs_partitions, FsLedger};
    use crate::store::MemoryKnowledgeStore;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        store: Arc<MemoryKnowledgeStore>,
        transcriber: Arc<FakeTranscriber>,
        audio: Arc<FakeAudio>,
    }

    impl Fixture {
        fn new(text: &str, audio: FakeAudio) -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                store: Arc::new(MemoryKnowledgeStore::new()),
                transcriber: Arc::new(FakeTranscriber::new(text)),
                audio: Arc::new(audio),
            }
        }

        fn adapter(&self) -> TranscriptAdapter {
            TranscriptAdapter::new(
                self.dir.path(),
                fs_partitions(self.dir.path()),
                self.transcriber.clone(),
                self.audio.clone(),
                IngestionSink::new(self.store.clone()),
            )
            .with_transcode_threshold(16)
        }

        fn recording(&self, creator: &str, name: &str, size: usize) -> PathBuf {
            let dir = self.dir.path().join(creator);
            fs::create_dir_all(&dir).unwrap();
            let path = dir.join(name);
            fs::write(&path, vec![0u8; size]).unwrap();
            path
        }
    }

    #[test]
    fn test_transcribes_and_records_artifact() {
        let fx = Fixture::new("  hello from the video  ", FakeAudio::default());
        fx.recording("ana", "ep1.mp4", 4);
        fs::write(fx.dir.path().join("ana").join("cover.png"), b"x").unwrap();

        let report = fx.adapter().run();
        assert_eq!(report.committed, vec!["ana/ep1.mp4"]);

        let artifact: TranscriptArtifact =
            serde_json::from_str(&fs::read_to_string(fx.dir.path().join("ana/ep1.json")).unwrap()).unwrap();
        assert_eq!(artifact, TranscriptArtifact::new("ana", "ep1.mp4", "hello from the video"));

        let item = fx.store.get("ana - ep1").unwrap();
        assert_eq!(item.metadata.text(keys::KIND), Some("transcript"));
        assert_eq!(item.metadata.text(keys::AUTHOR), Some("ana"));
        assert_eq!(item.metadata.text(keys::FILE), Some("ep1.json"));
    }

    #[test]
    fn test_existing_artifact_skips_transcription() {
        let fx = Fixture::new("fresh", FakeAudio::default());
        fx.recording("ana", "ep1.mp4", 4);
        let artifact = TranscriptArtifact::new("ana", "ep1.mp4", "recorded earlier");
        FsLedger::<TranscriptArtifact>::new(fx.dir.path().join("ana"))
            .record("ep1", &artifact)
            .unwrap();

        fx.adapter().run();

        assert_eq!(fx.transcriber.calls(), 0);
        assert_eq!(fx.store.get("ana - ep1").unwrap().text, "recorded earlier");
    }

    #[test]
    fn test_injected_ledger_is_used_instead_of_disk() {
        let fx = Fixture::new("from memory", FakeAudio::default());
        fx.recording("ana", "ep1.mp4", 4);
        let ledgers = memory_partitions::<TranscriptArtifact>();
        let adapter = TranscriptAdapter::new(
            fx.dir.path(),
            ledgers.clone(),
            fx.transcriber.clone(),
            fx.audio.clone(),
            IngestionSink::new(fx.store.clone()),
        );

        adapter.run();
        let second = adapter.run();

        assert_eq!(second.unchanged, vec!["ana/ep1.mp4"]);
        assert_eq!(fx.transcriber.calls(), 1);
        assert!(!fx.dir.path().join("ana/ep1.json").exists());
        assert_eq!(ledgers("ana").lookup("ep1").unwrap().unwrap().transcript, "from memory");
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let fx = Fixture::new("text", FakeAudio::default());
        fx.recording("ana", "ep1.mp4", 4);
        fx.recording("bia", "ep1.mp4", 4);

        let first = fx.adapter().run();
        let second = fx.adapter().run();

        assert_eq!(first.committed.len(), 2);
        assert_eq!(second.unchanged.len(), 2);
        assert_eq!(fx.transcriber.calls(), 2);
        assert_eq!(fx.store.writes(), 2);
    }

    #[test]
    fn test_legacy_text_is_upgraded() {
        let fx = Fixture::new("unused", FakeAudio::default());
        fx.recording("ana", "ep2.mov", 4);
        fs::write(fx.dir.path().join("ana/ep2.txt"), "old transcript\n").unwrap();

        fx.adapter().run();

        assert_eq!(fx.transcriber.calls(), 0);
        let ledger: FsLedger<TranscriptArtifact> = FsLedger::new(fx.dir.path().join("ana"));
        let artifact = ledger.lookup("ep2").unwrap().unwrap();
        assert_eq!(artifact.original_file, "ep2.mov");
        assert_eq!(artifact.transcript, "old transcript");
    }

    #[test]
    fn test_empty_legacy_text_is_skipped() {
        let fx = Fixture::new("unused", FakeAudio::default());
        fx.recording("ana", "ep3.mp4", 4);
        fs::write(fx.dir.path().join("ana/ep3.txt"), "  ").unwrap();

        let report = fx.adapter().run();

        assert_eq!(report.skipped.len(), 1);
        assert!(fx.store.is_empty());
    }

    #[test]
    fn test_empty_transcription_writes_no_artifact() {
        let fx = Fixture::new("   ", FakeAudio::default());
        fx.recording("ana", "silent.mp4", 4);

        let report = fx.adapter().run();

        assert_eq!(report.skipped.len(), 1);
        assert!(!fx.dir.path().join("ana/silent.json").exists());
        assert!(fx.store.is_empty());
    }

    #[test]
    fn test_large_recording_is_transcoded() {
        let fx = Fixture::new("text", FakeAudio::default());
        fx.recording("ana", "long.mp4", 64);

        fx.adapter().run();

        let seen = fx.transcriber.seen.lock().unwrap();
        assert_eq!(fx.audio.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(seen[0].extension().unwrap(), "mp3");
    }

    #[test]
    fn test_failed_transcode_falls_back_to_original() {
        let fx = Fixture::new("text", FakeAudio { fail: true, ..Default::default() });
        let path = fx.recording("ana", "long.mp4", 64);

        let report = fx.adapter().run();

        assert_eq!(report.committed.len(), 1);
        assert_eq!(fx.transcriber.seen.lock().unwrap()[0], path);
    }

    #[test]
    fn test_hidden_and_loose_files_ignored() {
        let fx = Fixture::new("text", FakeAudio::default());
        fx.recording(".cache", "x.mp4", 4);
        fs::write(fx.dir.path().join("loose.mp4"), b"x").unwrap();

        let adapter = fx.adapter();
        assert!(adapter.creators().unwrap().is_empty());
        assert!(adapter.discover().unwrap().is_empty());
    }
}
