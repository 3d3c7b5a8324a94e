//! Source adapters: each turns one kind of raw input into knowledge items
//! committed through the shared [`IngestionSink`](crate::sink::IngestionSink).

mod captions;
mod documents;
mod transcripts;

pub use captions::{
    fetch_captions, join_fragments, parse_video_id, read_reference_list, select_tracks, CaptionAdapter,
    CaptionArtifact, FetchedCaptions,
};
pub use documents::DocumentAdapter;
pub use transcripts::{TranscriptAdapter, TranscriptArtifact, RECORDING_EXTENSIONS};
pub(crate) use transcripts::creator_dirs;

use crate::error::IngestResult;
use crate::sink::CommitOutcome;
use mimeo_core::SourceItem;
use tracing::{debug, warn};

/// What happened to one source item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// A new knowledge item was written.
    Committed,
    /// Already extracted and already in the store.
    Unchanged,
    /// Not ingested, for a reason that does not stop the batch.
    Skipped { reason: String },
}

impl ItemOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        ItemOutcome::Skipped {
            reason: reason.into(),
        }
    }
}

impl From<CommitOutcome> for ItemOutcome {
    fn from(outcome: CommitOutcome) -> Self {
        match outcome {
            CommitOutcome::Committed => ItemOutcome::Committed,
            CommitOutcome::Skipped => ItemOutcome::Unchanged,
        }
    }
}

/// Per-item results of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub committed: Vec<String>,
    pub unchanged: Vec<String>,
    /// `(item, reason)`
    pub skipped: Vec<(String, String)>,
    /// `(item, error)`
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one item's result into the report, logging skips and failures.
    pub fn record(&mut self, label: impl Into<String>, result: IngestResult<ItemOutcome>) {
        let label = label.into();
        match result {
            Ok(ItemOutcome::Committed) => {
                debug!("Committed {}", label);
                self.committed.push(label);
            }
            Ok(ItemOutcome::Unchanged) => {
                debug!("Unchanged {}", label);
                self.unchanged.push(label);
            }
            Ok(ItemOutcome::Skipped { reason }) => self.skip(label, reason),
            Err(e) => {
                warn!("Failed {}: {}", label, e);
                self.failed.push((label, e.to_string()));
            }
        }
    }

    pub fn skip(&mut self, label: impl Into<String>, reason: impl Into<String>) {
        let (label, reason) = (label.into(), reason.into());
        warn!("Skipped {}: {}", label, reason);
        self.skipped.push((label, reason));
    }

    pub fn fail(&mut self, label: impl Into<String>, error: impl std::fmt::Display) {
        let label = label.into();
        warn!("Failed {}: {}", label, error);
        self.failed.push((label, error.to_string()));
    }

    pub fn merge(&mut self, other: BatchReport) {
        self.committed.extend(other.committed);
        self.unchanged.extend(other.unchanged);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
    }

    pub fn total(&self) -> usize {
        self.committed.len() + self.unchanged.len() + self.skipped.len() + self.failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Common contract for the document, transcript and caption adapters.
pub trait SourceAdapter {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Enumerate the current state of the source.
    fn discover(&self) -> IngestResult<Vec<SourceItem>>;

    /// Extract and commit one item. Errors are isolated to that item.
    fn ingest(&self, item: &SourceItem) -> IngestResult<ItemOutcome>;

    /// Discover then ingest everything, collecting per-item results.
    fn run(&self) -> BatchReport {
        let mut report = BatchReport::new();
        match self.discover() {
            Ok(items) => {
                for item in &items {
                    report.record(item.label(), self.ingest(item));
                }
            }
            Err(e) => report.fail(self.name(), e),
        }
        report
    }
}
