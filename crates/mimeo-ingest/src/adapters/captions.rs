//! Platform captions for a list of video URLs.

use super::{BatchReport, ItemOutcome, SourceAdapter};
use crate::error::{IngestError, IngestResult};
use crate::ledger::Ledger;
use crate::services::{classify_or_default, CaptionSource, CaptionTrack, Classifier, ServiceFailure, ServiceResult};
use crate::sink::IngestionSink;
use mimeo_core::{keys, ItemKind, KnowledgeItem, Locator, MetadataBag, SourceItem};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const ARTIFACT_KIND: &str = "caption";

/// Persisted captions of one video, keyed by video id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionArtifact {
    pub kind: String,
    pub video_id: String,
    pub url: String,
    /// Human-readable language name of the chosen track.
    pub language: String,
    pub language_code: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub classification: String,
    pub transcript: String,
}

/// Text of the track that was picked for a video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedCaptions {
    pub track: CaptionTrack,
    pub text: String,
}

pub struct CaptionAdapter {
    urls_file: PathBuf,
    ledger: Arc<dyn Ledger<CaptionArtifact>>,
    source: Arc<dyn CaptionSource>,
    classifier: Arc<dyn Classifier>,
    sink: IngestionSink,
    languages: Vec<String>,
    delay: Duration,
}

impl CaptionAdapter {
    pub fn new(
        urls_file: impl Into<PathBuf>,
        ledger: Arc<dyn Ledger<CaptionArtifact>>,
        source: Arc<dyn CaptionSource>,
        classifier: Arc<dyn Classifier>,
        sink: IngestionSink,
    ) -> Self {
        Self {
            urls_file: urls_file.into(),
            ledger,
            source,
            classifier,
            sink,
            languages: vec!["pt".to_string(), "pt-BR".to_string(), "en".to_string()],
            delay: Duration::from_millis(1000),
        }
    }

    /// Preferred caption languages, highest priority first.
    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        self.languages = languages;
        self
    }

    /// Pause between successive downloads.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Ingest one video. `Ok((outcome, fetched))`, where `fetched` says
    /// whether the caption source was contacted.
    fn ingest_video(&self, url: &str, video_id: &str) -> IngestResult<(ItemOutcome, bool)> {
        if let Some(artifact) = self.ledger.lookup(video_id)? {
            debug!("Reusing captions for {}", video_id);
            if artifact.transcript.trim().is_empty() {
                return Ok((ItemOutcome::skipped("recorded captions are empty"), false));
            }
            return Ok((self.submit(&artifact)?, false));
        }

        info!("Fetching captions for {}", video_id);
        let fetched = match fetch_captions(self.source.as_ref(), video_id, &self.languages) {
            Ok(fetched) => fetched,
            Err(e) => return Ok((ItemOutcome::skipped(format!("no captions: {}", e)), true)),
        };

        let (classification, status) = classify_or_default(self.classifier.as_ref(), &fetched.text);
        let artifact = CaptionArtifact {
            kind: ARTIFACT_KIND.to_string(),
            video_id: video_id.to_string(),
            url: url.to_string(),
            language: fetched.track.language,
            language_code: fetched.track.language_code,
            topic: classification.topic,
            keywords: classification.keywords,
            classification: status.as_str().to_string(),
            transcript: fetched.text,
        };
        self.ledger.record(video_id, &artifact)?;

        Ok((self.submit(&artifact)?, true))
    }

    fn submit(&self, artifact: &CaptionArtifact) -> IngestResult<ItemOutcome> {
        let mut metadata = MetadataBag::for_kind(ItemKind::Caption)
            .with(keys::VIDEO_ID, artifact.video_id.as_str())
            .with(keys::URL, artifact.url.as_str())
            .with(keys::LANGUAGE, artifact.language_code.as_str())
            .with(keys::TOPIC, artifact.topic.as_str())
            .with(keys::KEYWORDS, artifact.keywords.clone())
            .with(keys::FILE, format!("{}.json", artifact.video_id));
        if !artifact.classification.is_empty() {
            metadata.insert(keys::CLASSIFICATION, artifact.classification.as_str());
        }

        let item = KnowledgeItem::new(
            format!("caption-{}", artifact.video_id),
            artifact.transcript.clone(),
            metadata,
        );
        Ok(self.sink.commit(item)?.into())
    }
}

impl SourceAdapter for CaptionAdapter {
    fn name(&self) -> &'static str {
        "captions"
    }

    fn discover(&self) -> IngestResult<Vec<SourceItem>> {
        Ok(read_reference_list(&self.urls_file)?
            .into_iter()
            .map(|url| SourceItem::remote(ItemKind::Caption, url))
            .collect())
    }

    fn ingest(&self, item: &SourceItem) -> IngestResult<ItemOutcome> {
        let Locator::Remote(url) = &item.locator else {
            return Err(IngestError::InvalidReference(item.locator.to_string()));
        };
        let video_id = parse_video_id(url).ok_or_else(|| IngestError::InvalidReference(url.clone()))?;
        Ok(self.ingest_video(url, &video_id)?.0)
    }

    /// Duplicate references are collapsed and downloads are spaced out.
    fn run(&self) -> BatchReport {
        let mut report = BatchReport::new();
        let items = match self.discover() {
            Ok(items) => items,
            Err(e) => {
                report.fail(self.name(), e);
                return report;
            }
        };

        let mut seen = HashSet::new();
        let mut fetched_any = false;
        for item in &items {
            let url = item.label();
            let Some(video_id) = parse_video_id(&url) else {
                report.skip(url, "not a recognisable video reference");
                continue;
            };
            if !seen.insert(video_id.clone()) {
                report.skip(url, format!("duplicate of {}", video_id));
                continue;
            }

            if fetched_any && !self.delay.is_zero() && self.ledger.lookup(&video_id).ok().flatten().is_none() {
                std::thread::sleep(self.delay);
            }

            match self.ingest_video(&url, &video_id) {
                Ok((outcome, fetched)) => {
                    fetched_any |= fetched;
                    report.record(url, Ok(outcome));
                }
                Err(e) => report.record(url, Err(e)),
            }
        }

        report
    }
}

/// Non-empty lines of a reference list, skipping `#` comments.
/// A missing list is treated as empty.
pub fn read_reference_list(path: &Path) -> IngestResult<Vec<String>> {
    if !path.is_file() {
        warn!("Reference list {} does not exist", path.display());
        return Ok(Vec::new());
    }

    let contents = std::fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn is_video_id(id: &str) -> bool {
    id.len() == 11 && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Extract the 11-character video id from the URL shapes the platform uses.
pub fn parse_video_id(reference: &str) -> Option<String> {
    let reference = reference.trim();
    let url = if reference.contains("://") {
        Url::parse(reference).ok()?
    } else {
        Url::parse(&format!("https://{}", reference)).ok()?
    };

    let host = url.host_str()?.to_ascii_lowercase();
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .unwrap_or(&host);
    let segments: Vec<&str> = url.path_segments().map(|s| s.collect()).unwrap_or_default();

    let candidate = if host == "youtu.be" {
        segments.first().map(|s| s.to_string())
    } else if host == "youtube.com" || host == "youtube-nocookie.com" || host == "music.youtube.com" {
        match segments.as_slice() {
            ["watch", ..] => url
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.to_string()),
            ["embed" | "shorts" | "v" | "live", id, ..] => Some(id.to_string()),
            _ => None,
        }
    } else {
        None
    };

    candidate.filter(|id| is_video_id(id))
}

/// Order tracks for download: preferred languages in priority order, an
/// uploaded track before a generated one, then everything else as listed.
pub fn select_tracks(tracks: &[CaptionTrack], preferred: &[String]) -> Vec<CaptionTrack> {
    let mut ordered = Vec::with_capacity(tracks.len());
    for code in preferred {
        for generated in [false, true] {
            ordered.extend(
                tracks
                    .iter()
                    .filter(|t| t.generated == generated && t.language_code.eq_ignore_ascii_case(code))
                    .cloned(),
            );
        }
    }
    for track in tracks {
        if !ordered.contains(track) {
            ordered.push(track.clone());
        }
    }
    ordered
}

/// Fetch the first usable track of `video_id`, trying tracks in
/// [`select_tracks`] order.
pub fn fetch_captions(
    source: &dyn CaptionSource,
    video_id: &str,
    preferred: &[String],
) -> ServiceResult<FetchedCaptions> {
    let tracks = source.list_tracks(video_id)?;
    if tracks.is_empty() {
        return Err(ServiceFailure::NotFound(format!("{} has no caption tracks", video_id)));
    }

    let mut last_error = None;
    for track in select_tracks(&tracks, preferred) {
        match source.fetch_track(&track) {
            Ok(fragments) => {
                let text = join_fragments(&fragments);
                if text.is_empty() {
                    debug!("Track {} of {} is empty", track.language_code, video_id);
                    continue;
                }
                return Ok(FetchedCaptions { track, text });
            }
            Err(e) => {
                warn!("Track {} of {} failed: {}", track.language_code, video_id, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| ServiceFailure::NotFound(format!("{} has only empty tracks", video_id))))
}

/// Flatten caption fragments into one line of text.
pub fn join_fragments(fragments: &[String]) -> String {
    fragments
        .iter()
        .map(|f| f.replace('\n', " "))
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::FakeClassifier;
    use crate::ledger::FsLedger;
    use crate::store::MemoryKnowledgeStore;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn track(code: &str, generated: bool) -> CaptionTrack {
        CaptionTrack {
            language_code: code.to_string(),
            language: code.to_uppercase(),
            url: format!("https://captions.test/{}/{}", code, generated),
            generated,
        }
    }

    #[derive(Default)]
    struct FakeSource {
        tracks: HashMap<String, Vec<CaptionTrack>>,
        bodies: HashMap<String, Vec<String>>,
        listed: AtomicUsize,
    }

    impl CaptionSource for FakeSource {
        fn list_tracks(&self, video_id: &str) -> ServiceResult<Vec<CaptionTrack>> {
            self.listed.fetch_add(1, Ordering::SeqCst);
            self.tracks
                .get(video_id)
                .cloned()
                .ok_or_else(|| ServiceFailure::NotFound("video unavailable".into()))
        }

        fn fetch_track(&self, track: &CaptionTrack) -> ServiceResult<Vec<String>> {
            self.bodies
                .get(&track.url)
                .cloned()
                .ok_or_else(|| ServiceFailure::Transient("timeout".into()))
        }
    }

    #[test]
    fn test_parse_video_id_shapes() {
        let id = Some("dQw4w9WgXcQ".to_string());
        assert_eq!(parse_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), id);
        assert_eq!(parse_video_id("https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=10"), id);
        assert_eq!(parse_video_id("https://youtu.be/dQw4w9WgXcQ?si=abc"), id);
        assert_eq!(parse_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"), id);
        assert_eq!(parse_video_id("https://m.youtube.com/shorts/dQw4w9WgXcQ"), id);
        assert_eq!(parse_video_id("youtube.com/v/dQw4w9WgXcQ"), id);
    }

    #[test]
    fn test_parse_video_id_rejects() {
        assert_eq!(parse_video_id("https://vimeo.com/123456"), None);
        assert_eq!(parse_video_id("https://www.youtube.com/watch?v=short"), None);
        assert_eq!(parse_video_id("https://www.youtube.com/channel/UC123"), None);
        assert_eq!(parse_video_id("not a url at all"), None);
    }

    #[test]
    fn test_read_reference_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "# my list\n\nhttps://youtu.be/dQw4w9WgXcQ\n  \n  https://youtu.be/aaaaaaaaaaa  \n").unwrap();

        let refs = read_reference_list(&path).unwrap();
        assert_eq!(refs, vec!["https://youtu.be/dQw4w9WgXcQ", "https://youtu.be/aaaaaaaaaaa"]);
        assert!(read_reference_list(&dir.path().join("absent.txt")).unwrap().is_empty());
    }

    #[test]
    fn test_select_tracks_order() {
        let tracks = vec![track("en", true), track("de", false), track("pt", true), track("pt", false)];
        let ordered = select_tracks(&tracks, &["pt".to_string(), "en".to_string()]);

        let keys: Vec<(String, bool)> = ordered.iter().map(|t| (t.language_code.clone(), t.generated)).collect();
        assert_eq!(
            keys,
            vec![
                ("pt".to_string(), false),
                ("pt".to_string(), true),
                ("en".to_string(), true),
                ("de".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_fetch_falls_through_failed_tracks() {
        let mut source = FakeSource::default();
        let pt = track("pt", false);
        let en = track("en", false);
        source.tracks.insert("vid".into(), vec![en.clone(), pt.clone()]);
        // pt body missing: fetch fails, en is used
        source.bodies.insert(en.url.clone(), vec!["hello\nworld".into(), "".into(), "again".into()]);

        let fetched = fetch_captions(&source, "vid", &["pt".to_string(), "en".to_string()]).unwrap();
        assert_eq!(fetched.track.language_code, "en");
        assert_eq!(fetched.text, "hello world again");
    }

    fn default_languages() -> Vec<String> {
        vec!["pt".to_string(), "pt-BR".to_string(), "en".to_string()]
    }

    fn source_serving(video_id: &str, tracks: Vec<CaptionTrack>) -> FakeSource {
        let mut source = FakeSource::default();
        for t in &tracks {
            source.bodies.insert(t.url.clone(), vec![format!("spoken in {}", t.language_code)]);
        }
        source.tracks.insert(video_id.to_string(), tracks);
        source
    }

    #[test]
    fn test_regional_variant_ranks_above_secondary_language() {
        let source = source_serving("vid", vec![track("en", false), track("pt-BR", false)]);

        let fetched = fetch_captions(&source, "vid", &default_languages()).unwrap();
        assert_eq!(fetched.track.language_code, "pt-BR");
        assert_eq!(fetched.text, "spoken in pt-BR");
    }

    #[test]
    fn test_no_preferred_track_uses_first_listed() {
        let source = source_serving("vid", vec![track("de", false), track("fr", false)]);

        let fetched = fetch_captions(&source, "vid", &default_languages()).unwrap();
        assert_eq!(fetched.track.language_code, "de");
    }

    #[test]
    fn test_fetch_no_tracks() {
        let mut source = FakeSource::default();
        source.tracks.insert("vid".into(), vec![]);
        assert!(matches!(
            fetch_captions(&source, "vid", &[]),
            Err(ServiceFailure::NotFound(_))
        ));
    }

    struct Fixture {
        dir: TempDir,
        store: Arc<MemoryKnowledgeStore>,
        source: Arc<FakeSource>,
    }

    impl Fixture {
        fn new(urls: &str, source: FakeSource) -> Self {
            let dir = TempDir::new().unwrap();
            std::fs::write(dir.path().join("urls.txt"), urls).unwrap();
            Self {
                dir,
                store: Arc::new(MemoryKnowledgeStore::new()),
                source: Arc::new(source),
            }
        }

        fn adapter(&self) -> CaptionAdapter {
            CaptionAdapter::new(
                self.dir.path().join("urls.txt"),
                Arc::new(FsLedger::<CaptionArtifact>::new(self.dir.path().join("youtube"))),
                self.source.clone(),
                Arc::new(FakeClassifier::default()),
                IngestionSink::new(self.store.clone()),
            )
            .with_delay(Duration::ZERO)
        }
    }

    fn source_with(video_id: &str, text: &str) -> FakeSource {
        let mut source = FakeSource::default();
        let pt = track("pt", false);
        source.bodies.insert(pt.url.clone(), vec![text.to_string()]);
        source.tracks.insert(video_id.to_string(), vec![pt]);
        source
    }

    #[test]
    fn test_run_ingests_and_records() {
        let fx = Fixture::new("https://youtu.be/dQw4w9WgXcQ\n", source_with("dQw4w9WgXcQ", "ola pessoal"));

        let report = fx.adapter().run();
        assert_eq!(report.committed.len(), 1);

        let item = fx.store.get("caption-dQw4w9WgXcQ").unwrap();
        assert_eq!(item.text, "ola pessoal");
        assert_eq!(item.metadata.text(keys::KIND), Some("caption"));
        assert_eq!(item.metadata.text(keys::VIDEO_ID), Some("dQw4w9WgXcQ"));
        assert_eq!(item.metadata.text(keys::LANGUAGE), Some("pt"));
        assert_eq!(item.metadata.text(keys::TOPIC), Some("mindset"));

        let artifact: CaptionArtifact = serde_json::from_str(
            &std::fs::read_to_string(fx.dir.path().join("youtube/dQw4w9WgXcQ.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(artifact.kind, "caption");
        assert_eq!(artifact.url, "https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(artifact.classification, "llm");
    }

    #[test]
    fn test_run_records_secondary_language() {
        let fx = Fixture::new(
            "https://youtu.be/dQw4w9WgXcQ\n",
            source_serving("dQw4w9WgXcQ", vec![track("de", false), track("en", true)]),
        );

        let report = fx.adapter().run();
        assert_eq!(report.committed.len(), 1);

        let item = fx.store.get("caption-dQw4w9WgXcQ").unwrap();
        assert_eq!(item.metadata.text(keys::LANGUAGE), Some("en"));
        assert_eq!(item.text, "spoken in en");

        let artifact: CaptionArtifact = serde_json::from_str(
            &std::fs::read_to_string(fx.dir.path().join("youtube/dQw4w9WgXcQ.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(artifact.language_code, "en");
    }

    #[test]
    fn test_duplicates_within_run_fetch_once() {
        let urls = "https://youtu.be/dQw4w9WgXcQ\nhttps://www.youtube.com/watch?v=dQw4w9WgXcQ\n";
        let fx = Fixture::new(urls, source_with("dQw4w9WgXcQ", "text"));

        let report = fx.adapter().run();

        assert_eq!(report.committed.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(fx.source.listed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_second_run_uses_ledger() {
        let fx = Fixture::new("https://youtu.be/dQw4w9WgXcQ\n", source_with("dQw4w9WgXcQ", "text"));

        fx.adapter().run();
        let second = fx.adapter().run();

        assert_eq!(second.unchanged.len(), 1);
        assert_eq!(fx.source.listed.load(Ordering::SeqCst), 1);
        assert_eq!(fx.store.writes(), 1);
    }

    #[test]
    fn test_unavailable_video_is_skipped() {
        let fx = Fixture::new(
            "https://youtu.be/aaaaaaaaaaa\nhttps://example.com/nothing\nhttps://youtu.be/dQw4w9WgXcQ\n",
            source_with("dQw4w9WgXcQ", "text"),
        );

        let report = fx.adapter().run();

        assert_eq!(report.committed.len(), 1);
        assert_eq!(report.skipped.len(), 2);
        assert!(!fx.dir.path().join("youtube/aaaaaaaaaaa.json").exists());
    }
}
