//! The single choke point every adapter commits through.

use crate::error::{IngestError, IngestResult};
use crate::store::{AddOutcome, KnowledgeStore};
use mimeo_core::{keys, KnowledgeItem};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// The store already held an item with this name.
    Skipped,
}

#[derive(Clone)]
pub struct IngestionSink {
    store: Arc<dyn KnowledgeStore>,
}

impl IngestionSink {
    pub fn new(store: Arc<dyn KnowledgeStore>) -> Self {
        Self { store }
    }

    /// Commit `item` unless one with the same name is already stored.
    pub fn commit(&self, item: KnowledgeItem) -> IngestResult<CommitOutcome> {
        self.submit(item, true)
    }

    /// Commit `item`, overwriting any stored item with the same name.
    pub fn replace(&self, item: KnowledgeItem) -> IngestResult<CommitOutcome> {
        self.submit(item, false)
    }

    /// Whether the store already holds an item with this name.
    pub fn contains(&self, name: &str) -> IngestResult<bool> {
        self.store.contains(name)
    }

    fn submit(&self, item: KnowledgeItem, skip_if_exists: bool) -> IngestResult<CommitOutcome> {
        if item.kind().is_none() {
            return Err(IngestError::Store(format!(
                "item '{}' has no valid '{}' metadata",
                item.name,
                keys::KIND
            )));
        }

        let outcome = match self.store.add(&item, skip_if_exists)? {
            AddOutcome::Added | AddOutcome::Replaced => CommitOutcome::Committed,
            AddOutcome::AlreadyPresent => CommitOutcome::Skipped,
        };
        debug!("Commit '{}': {:?}", item.name, outcome);
        Ok(outcome)
    }
}
