//! Documents (PDF and plain text) under a categorised content root.

use super::{ItemOutcome, SourceAdapter};
use crate::error::{IngestError, IngestResult};
use crate::metadata::structural_metadata;
use crate::parsers::ParserSet;
use crate::services::{classify_or_default, Classifier};
use crate::sink::IngestionSink;
use mimeo_core::{keys, ItemKind, KnowledgeItem, Locator, MetadataBag, SourceItem};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub struct DocumentAdapter {
    root: PathBuf,
    parsers: ParserSet,
    classifier: Arc<dyn Classifier>,
    sink: IngestionSink,
}

impl DocumentAdapter {
    pub fn new(root: impl Into<PathBuf>, classifier: Arc<dyn Classifier>, sink: IngestionSink) -> Self {
        Self {
            root: root.into(),
            parsers: ParserSet::default(),
            classifier,
            sink,
        }
    }

    pub fn with_parsers(mut self, parsers: ParserSet) -> Self {
        self.parsers = parsers;
        self
    }

    /// Stable identity: the path relative to the content root.
    pub fn identity(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        format!("document-{}", parts.join("/"))
    }

    fn relative_file(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string()
    }
}

impl SourceAdapter for DocumentAdapter {
    fn name(&self) -> &'static str {
        "documents"
    }

    fn discover(&self) -> IngestResult<Vec<SourceItem>> {
        if !self.root.is_dir() {
            warn!("Document root {} does not exist", self.root.display());
            return Ok(Vec::new());
        }

        let mut items = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if entry.file_type().is_file() && self.parsers.supports(entry.path()) {
                items.push(SourceItem::file(ItemKind::Document, entry.into_path()));
            }
        }

        info!("Found {} documents under {}", items.len(), self.root.display());
        Ok(items)
    }

    fn ingest(&self, item: &SourceItem) -> IngestResult<ItemOutcome> {
        let Locator::File(path) = &item.locator else {
            return Err(IngestError::InvalidReference(item.locator.to_string()));
        };

        let name = self.identity(path);
        if self.sink.contains(&name)? {
            debug!("{} already in store", name);
            return Ok(ItemOutcome::Unchanged);
        }

        let Some(parser) = self.parsers.parser_for(path) else {
            return Ok(ItemOutcome::skipped("unsupported file type"));
        };

        let document = match parser.parse(path) {
            Ok(document) => document,
            Err(IngestError::ParseError { message, .. }) => {
                return Ok(ItemOutcome::Skipped { reason: message })
            }
            Err(e) => return Err(e),
        };
        if document.is_empty() {
            warn!("No text extracted from {}", path.display());
        }

        let (classification, status) = classify_or_default(self.classifier.as_ref(), &document.content);

        let mut metadata = structural_metadata(&self.root, path);
        metadata.merge(
            MetadataBag::new()
                .with(keys::TOPIC, classification.topic)
                .with(keys::AUTHOR, classification.author)
                .with(keys::KEYWORDS, classification.keywords),
        );
        metadata.merge(
            MetadataBag::for_kind(ItemKind::Document)
                .with(keys::CLASSIFICATION, status.as_str())
                .with(keys::FILE, self.relative_file(path)),
        );

        let outcome = self
            .sink
            .commit(KnowledgeItem::new(name, document.content, metadata))?;
        Ok(outcome.into())
    }
}
