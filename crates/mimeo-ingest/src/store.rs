//! Knowledge store backends.

use crate::chunker::Chunker;
use crate::error::{IngestError, IngestResult};
use crate::services::Embedder;
use mimeo_core::{ItemKind, KnowledgeItem, StoredItem};
use mimeo_db::{Database, DbError};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Result of one `add` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// An item with the same name was already stored; nothing was written.
    AlreadyPresent,
    /// An existing item with the same name was overwritten.
    Replaced,
}

/// Embedding-indexed store that knowledge items are committed into.
///
/// Identity is the item name: with `skip_if_exists`, resubmitting a name
/// that is already present is a no-op.
pub trait KnowledgeStore: Send + Sync {
    fn add(&self, item: &KnowledgeItem, skip_if_exists: bool) -> IngestResult<AddOutcome>;

    fn contains(&self, name: &str) -> IngestResult<bool>;
}

/// Hex SHA-256 of the committed text.
pub fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// SQLite store: items, chunks and (optionally) chunk embeddings.
pub struct SqliteKnowledgeStore {
    db: Database,
    chunker: Chunker,
    embedder: Option<Box<dyn Embedder>>,
}

impl SqliteKnowledgeStore {
    pub fn new(db: Database, chunker: Chunker) -> Self {
        Self {
            db,
            chunker,
            embedder: None,
        }
    }

    pub fn with_embedder(mut self, embedder: Box<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn embed_chunks(&self, name: &str, chunks: &[mimeo_core::Chunk]) {
        let Some(embedder) = &self.embedder else {
            return;
        };

        let mut embedded = 0;
        for chunk in chunks {
            let stored = embedder
                .embed(&chunk.content)
                .map_err(IngestError::from)
                .and_then(|vector| {
                    self.db
                        .store_embedding(&chunk.id, &vector, embedder.model())
                        .map_err(IngestError::from)
                });
            match stored {
                Ok(()) => embedded += 1,
                Err(e) => {
                    // Chunks stay searchable by text; vectors can be added later
                    warn!("Embedding failed for '{}' chunk {}: {}", name, chunk.chunk_index, e);
                    break;
                }
            }
        }
        debug!("Embedded {}/{} chunks of '{}'", embedded, chunks.len(), name);
    }
}

impl KnowledgeStore for SqliteKnowledgeStore {
    fn add(&self, item: &KnowledgeItem, skip_if_exists: bool) -> IngestResult<AddOutcome> {
        if skip_if_exists && self.db.item_exists(&item.name)? {
            debug!("'{}' already stored, skipping", item.name);
            return Ok(AddOutcome::AlreadyPresent);
        }

        let kind = item.kind().unwrap_or(ItemKind::Document);
        let stored = StoredItem::new(kind, &item.name, content_hash(&item.text))
            .with_metadata(item.metadata.to_json());
        let chunks = self.chunker.chunk_text(&stored.id, &item.text);

        let outcome = if skip_if_exists {
            match self.db.insert_item_with_chunks(&stored, &chunks) {
                Ok(()) => AddOutcome::Added,
                Err(DbError::Duplicate(_)) => return Ok(AddOutcome::AlreadyPresent),
                Err(e) => return Err(e.into()),
            }
        } else if self.db.replace_item_with_chunks(&stored, &chunks)? {
            AddOutcome::Replaced
        } else {
            AddOutcome::Added
        };

        info!("Stored '{}' ({} chunks)", item.name, chunks.len());
        self.embed_chunks(&item.name, &chunks);
        Ok(outcome)
    }

    fn contains(&self, name: &str) -> IngestResult<bool> {
        Ok(self.db.item_exists(name)?)
    }
}

/// In-process store that keeps items in a map and counts writes.
#[derive(Default)]
pub struct MemoryKnowledgeStore {
    items: Mutex<BTreeMap<String, KnowledgeItem>>,
    writes: AtomicUsize,
}

impl MemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `add` calls that wrote something.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn get(&self, name: &str) -> Option<KnowledgeItem> {
        self.lock().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, KnowledgeItem>> {
        // A panicked writer leaves the map itself intact
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KnowledgeStore for MemoryKnowledgeStore {
    fn add(&self, item: &KnowledgeItem, skip_if_exists: bool) -> IngestResult<AddOutcome> {
        let mut items = self.lock();
        let existed = items.contains_key(&item.name);
        if existed && skip_if_exists {
            return Ok(AddOutcome::AlreadyPresent);
        }
        items.insert(item.name.clone(), item.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(if existed {
            AddOutcome::Replaced
        } else {
            AddOutcome::Added
        })
    }

    fn contains(&self, name: &str) -> IngestResult<bool> {
        Ok(self.lock().contains_key(name))
    }
}
