//! Per-creator style profiles built from recorded transcripts.

use crate::adapters::{BatchReport, ItemOutcome, TranscriptArtifact};
use crate::error::IngestResult;
use crate::ledger::{Ledger, LedgerFactory};
use crate::services::{ServiceFailure, StyleAnalyzer};
use crate::sink::IngestionSink;
use mimeo_core::{keys, CreatorProfile, ItemKind, KnowledgeItem, MetadataBag};
use std::fmt::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub struct ProfileAggregator {
    videos_dir: PathBuf,
    transcripts: LedgerFactory<TranscriptArtifact>,
    profiles: Arc<dyn Ledger<CreatorProfile>>,
    analyzer: Arc<dyn StyleAnalyzer>,
    sink: IngestionSink,
}

impl ProfileAggregator {
    pub fn new(
        videos_dir: impl Into<PathBuf>,
        transcripts: LedgerFactory<TranscriptArtifact>,
        profiles: Arc<dyn Ledger<CreatorProfile>>,
        analyzer: Arc<dyn StyleAnalyzer>,
        sink: IngestionSink,
    ) -> Self {
        Self {
            videos_dir: videos_dir.into(),
            transcripts,
            profiles,
            analyzer,
            sink,
        }
    }

    /// Profile every creator directory. `force` re-analyses creators that
    /// already have a stored profile.
    pub fn run(&self, force: bool) -> BatchReport {
        let mut report = BatchReport::new();
        match crate::adapters::creator_dirs(&self.videos_dir) {
            Ok(creators) => {
                for (creator, _) in creators {
                    let result = self.generate(&creator, force);
                    report.record(creator, result);
                }
            }
            Err(e) => report.fail("profiles", e),
        }
        report
    }

    /// Profile one creator from the transcripts in their ledger.
    ///
    /// A stored profile is only re-submitted. A fresh analysis always
    /// replaces whatever the store holds for the creator.
    pub fn generate(&self, creator: &str, force: bool) -> IngestResult<ItemOutcome> {
        if !force {
            if let Some(profile) = self.profiles.lookup(creator)? {
                return self.submit(creator, &profile, false);
            }
        }

        let corpus = collect_transcripts((self.transcripts)(creator).as_ref())?;
        if corpus.is_empty() {
            return Ok(ItemOutcome::skipped("no transcripts"));
        }

        info!("Analysing style of {} ({} chars)", creator, corpus.len());
        let mut profile = match self.analyzer.analyze(creator, &corpus) {
            Ok(profile) => profile,
            Err(e) => return Ok(ItemOutcome::skipped(format!("style analysis failed: {}", e))),
        };
        profile.author = creator.to_string();

        if let Err(e) = profile.validate() {
            let failure = ServiceFailure::MalformedResponse(e.to_string());
            return Ok(ItemOutcome::skipped(failure.to_string()));
        }

        self.profiles.record(creator, &profile)?;
        self.submit(creator, &profile, true)
    }

    fn submit(&self, creator: &str, profile: &CreatorProfile, replace: bool) -> IngestResult<ItemOutcome> {
        let metadata = MetadataBag::for_kind(ItemKind::Profile)
            .with(keys::AUTHOR, creator)
            .with(keys::FILE, format!("{}.json", creator));
        let item = KnowledgeItem::new(format!("profile-{}", creator), render_profile(profile), metadata);

        let outcome = if replace {
            self.sink.replace(item)?
        } else {
            self.sink.commit(item)?
        };
        Ok(outcome.into())
    }
}

/// Concatenate a creator's recorded transcripts, sorted by recording name,
/// each under a `--- VIDEO: <name> ---` marker.
pub fn collect_transcripts(ledger: &dyn Ledger<TranscriptArtifact>) -> IngestResult<String> {
    let mut sections = Vec::new();
    for key in ledger.keys()? {
        let artifact = match ledger.lookup(&key) {
            Ok(Some(artifact)) => artifact,
            Ok(None) => continue,
            Err(e) => {
                warn!("Ignoring unreadable transcript {}: {}", ledger.location(&key).display(), e);
                continue;
            }
        };
        if !artifact.transcript.trim().is_empty() {
            sections.push(format!("--- VIDEO: {} ---\n{}", key, artifact.transcript));
        }
    }

    Ok(sections.join("\n\n"))
}

/// Deterministic prose rendering, one section per dimension in rubric order.
/// Empty dimensions are left out.
pub fn render_profile(profile: &CreatorProfile) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = writeln!(out, "STYLE PROFILE: {}", profile.author);
    let _ = writeln!(out, "Summary: {}", profile.style_summary.trim());
    out.push('\n');

    for (key, dim) in profile.dimensions() {
        if dim.is_empty() {
            continue;
        }
        let _ = writeln!(out, "## {}", key.title());
        if !dim.description.trim().is_empty() {
            let _ = writeln!(out, "{}", dim.description.trim());
        }
        if let Some(label) = key.expressions_label() {
            if !dim.expressions.is_empty() {
                let _ = writeln!(out, "{}: {}", label, dim.expressions.join(", "));
            }
        }
        if !dim.examples.is_empty() {
            out.push_str("Real examples:\n");
            for example in &dim.examples {
                let _ = writeln!(out, "  - \"{}\"", example);
            }
        }
        if !dim.rules.is_empty() {
            out.push_str("Rules:\n");
            for rule in &dim.rules {
                let _ = writeln!(out, "  - {}", rule);
            }
        }
        out.push('\n');
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{fs_partitions, FsLedger};
    use crate::services::ServiceResult;
    use crate::store::MemoryKnowledgeStore;
    use mimeo_core::{StyleDimension, DIMENSIONS};
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn full_profile() -> CreatorProfile {
        let mut value = serde_json::json!({"author": "model says", "style_summary": "Direct and warm."});
        for key in DIMENSIONS {
            value[key.field()] = serde_json::json!({"description": format!("{} pattern", key.field())});
        }
        value["tone"]["examples"] = serde_json::json!(["Look, here's the thing"]);
        value["tone"]["rules"] = serde_json::json!(["Speak as a peer"]);
        value["vocabulary"]["expressions"] = serde_json::json!(["mano", "sacou"]);
        CreatorProfile::from_json(&value.to_string()).unwrap()
    }

    struct FakeAnalyzer {
        answer: ServiceResult<CreatorProfile>,
        corpora: Mutex<Vec<String>>,
    }

    impl FakeAnalyzer {
        fn new(answer: ServiceResult<CreatorProfile>) -> Self {
            Self {
                answer,
                corpora: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.corpora.lock().unwrap().len()
        }
    }

    impl StyleAnalyzer for FakeAnalyzer {
        fn analyze(&self, _creator: &str, transcripts: &str) -> ServiceResult<CreatorProfile> {
            self.corpora.lock().unwrap().push(transcripts.to_string());
            self.answer.clone()
        }
    }

    struct Fixture {
        dir: TempDir,
        store: Arc<MemoryKnowledgeStore>,
        analyzer: Arc<FakeAnalyzer>,
    }

    impl Fixture {
        fn new(answer: ServiceResult<CreatorProfile>) -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                store: Arc::new(MemoryKnowledgeStore::new()),
                analyzer: Arc::new(FakeAnalyzer::new(answer)),
            }
        }

        fn aggregator(&self) -> ProfileAggregator {
            self.aggregator_with(self.store.clone())
        }

        fn aggregator_with(&self, store: Arc<MemoryKnowledgeStore>) -> ProfileAggregator {
            ProfileAggregator::new(
                self.dir.path().join("videos"),
                fs_partitions(self.dir.path().join("videos")),
                Arc::new(FsLedger::<CreatorProfile>::new(self.dir.path().join("profiles"))),
                self.analyzer.clone(),
                IngestionSink::new(store),
            )
        }

        fn transcript(&self, creator: &str, stem: &str, text: &str) {
            let ledger: FsLedger<TranscriptArtifact> = FsLedger::new(self.dir.path().join("videos").join(creator));
            ledger
                .record(stem, &TranscriptArtifact::new(creator, format!("{}.mp4", stem), text))
                .unwrap();
        }
    }

    #[test]
    fn test_collect_transcripts_sorted_with_markers() {
        let fx = Fixture::new(Ok(full_profile()));
        fx.transcript("ana", "b-second", "two");
        fx.transcript("ana", "a-first", "one");
        fx.transcript("ana", "c-empty", "  ");

        let ledger = FsLedger::<TranscriptArtifact>::new(fx.dir.path().join("videos/ana"));
        let corpus = collect_transcripts(&ledger).unwrap();
        assert_eq!(corpus, "--- VIDEO: a-first ---\none\n\n--- VIDEO: b-second ---\ntwo");
    }

    #[test]
    fn test_generates_persists_and_commits() {
        let fx = Fixture::new(Ok(full_profile()));
        fx.transcript("ana", "ep1", "hello");

        let report = fx.aggregator().run(false);
        assert_eq!(report.committed, vec!["ana"]);

        let stored: FsLedger<CreatorProfile> = FsLedger::new(fx.dir.path().join("profiles"));
        let profile = stored.lookup("ana").unwrap().unwrap();
        assert_eq!(profile.author, "ana");
        assert_eq!(profile.dimensions().count(), 10);

        let item = fx.store.get("profile-ana").unwrap();
        assert_eq!(item.metadata.text(keys::KIND), Some("profile"));
        assert_eq!(item.metadata.text(keys::AUTHOR), Some("ana"));
        assert!(item.text.starts_with("STYLE PROFILE: ana\nSummary: Direct and warm.\n\n## TONE OF VOICE"));
    }

    #[test]
    fn test_rerun_reuses_stored_profile() {
        let fx = Fixture::new(Ok(full_profile()));
        fx.transcript("ana", "ep1", "hello");

        fx.aggregator().run(false);
        let second = fx.aggregator().run(false);

        assert_eq!(second.unchanged, vec!["ana"]);
        assert_eq!(fx.analyzer.calls(), 1);
    }

    #[test]
    fn test_stored_profile_repairs_wiped_store() {
        let fx = Fixture::new(Ok(full_profile()));
        fx.transcript("ana", "ep1", "hello");
        fx.aggregator().run(false);

        let fresh_store = Arc::new(MemoryKnowledgeStore::new());
        let report = fx.aggregator_with(fresh_store.clone()).run(false);

        assert_eq!(report.committed, vec!["ana"]);
        assert!(fresh_store.get("profile-ana").is_some());
        assert_eq!(fx.analyzer.calls(), 1);
    }

    #[test]
    fn test_fresh_analysis_replaces_stale_store_item() {
        let fx = Fixture::new(Ok(full_profile()));
        fx.transcript("ana", "ep1", "hello");
        let stale = KnowledgeItem::new(
            "profile-ana",
            "OLD",
            MetadataBag::for_kind(ItemKind::Profile).with(keys::AUTHOR, "ana"),
        );
        IngestionSink::new(fx.store.clone()).commit(stale).unwrap();

        let report = fx.aggregator().run(false);

        assert_eq!(report.committed, vec!["ana"]);
        let stored: FsLedger<CreatorProfile> = FsLedger::new(fx.dir.path().join("profiles"));
        let on_disk = stored.lookup("ana").unwrap().unwrap();
        assert_eq!(fx.store.get("profile-ana").unwrap().text, render_profile(&on_disk));
    }

    #[test]
    fn test_force_reanalyses_and_replaces() {
        let fx = Fixture::new(Ok(full_profile()));
        fx.transcript("ana", "ep1", "hello");

        fx.aggregator().run(false);
        let forced = fx.aggregator().run(true);

        assert_eq!(forced.committed, vec!["ana"]);
        assert_eq!(fx.analyzer.calls(), 2);
        assert_eq!(fx.store.writes(), 2);
    }

    #[test]
    fn test_creator_without_transcripts_is_skipped() {
        let fx = Fixture::new(Ok(full_profile()));
        std::fs::create_dir_all(fx.dir.path().join("videos/empty")).unwrap();

        let report = fx.aggregator().run(false);

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(fx.analyzer.calls(), 0);
        assert!(!fx.dir.path().join("profiles/empty.json").exists());
    }

    #[test]
    fn test_incomplete_profile_is_not_persisted() {
        let mut partial = full_profile();
        partial.hooks = StyleDimension::default();
        let fx = Fixture::new(Ok(partial));
        fx.transcript("ana", "ep1", "hello");

        let report = fx.aggregator().run(false);

        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].1.contains("hooks"));
        assert!(!fx.dir.path().join("profiles/ana.json").exists());
        assert!(fx.store.is_empty());
    }

    #[test]
    fn test_analyzer_failure_is_skipped() {
        let fx = Fixture::new(Err(ServiceFailure::Transient("timeout".into())));
        fx.transcript("ana", "ep1", "hello");

        let report = fx.aggregator().run(false);
        assert_eq!(report.skipped.len(), 1);
        assert!(!report.has_failures());
    }

    #[test]
    fn test_render_format() {
        let profile = full_profile();
        let text = render_profile(&profile);

        assert!(text.contains(
            "## TONE OF VOICE\ntone pattern\nReal examples:\n  - \"Look, here's the thing\"\nRules:\n  - Speak as a peer\n"
        ));
        assert!(text.contains("## VOCABULARY AND DICTION\nvocabulary pattern\nSlang and expressions: mano, sacou\n"));
        assert!(text.ends_with("## CALL-TO-ACTION STYLE\ncta pattern"));

        let positions: Vec<usize> = DIMENSIONS.iter().map(|k| text.find(k.title()).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
