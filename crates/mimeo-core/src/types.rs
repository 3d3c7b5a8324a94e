//! Core domain types for Mimeo.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for knowledge items.
pub type ItemId = String;

/// Unique identifier for chunks.
pub type ChunkId = String;

/// Generate a new unique ID.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Kind of content item. Stored under the `kind` metadata key and used
/// downstream to filter retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Document,
    Transcript,
    Caption,
    Profile,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Document => "document",
            ItemKind::Transcript => "transcript",
            ItemKind::Caption => "caption",
            ItemKind::Profile => "profile",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "document" => Some(ItemKind::Document),
            "transcript" => Some(ItemKind::Transcript),
            "caption" => Some(ItemKind::Caption),
            "profile" => Some(ItemKind::Profile),
            _ => None,
        }
    }

    /// All kinds, in display order.
    pub fn all() -> [ItemKind; 4] {
        [
            ItemKind::Document,
            ItemKind::Transcript,
            ItemKind::Caption,
            ItemKind::Profile,
        ]
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a source item physically lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// A file on the local filesystem.
    File(PathBuf),
    /// A remote reference, such as a video URL.
    Remote(String),
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::File(path) => write!(f, "{}", path.display()),
            Locator::Remote(reference) => write!(f, "{}", reference),
        }
    }
}

/// One physical unit of raw content discovered by an adapter.
///
/// Source items are never mutated; the payload is produced lazily by the
/// adapter that discovered the item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem {
    pub kind: ItemKind,
    pub locator: Locator,
    /// Owning creator, for per-creator sources.
    pub creator: Option<String>,
}

impl SourceItem {
    pub fn file(kind: ItemKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            locator: Locator::File(path.into()),
            creator: None,
        }
    }

    pub fn remote(kind: ItemKind, reference: impl Into<String>) -> Self {
        Self {
            kind,
            locator: Locator::Remote(reference.into()),
            creator: None,
        }
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    /// Short label for progress output and reports.
    pub fn label(&self) -> String {
        match &self.locator {
            Locator::File(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string()),
            Locator::Remote(reference) => reference.clone(),
        }
    }
}

/// A flat metadata value. The knowledge store only indexes flat scalars and
/// string lists, so there is no nesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Text(String),
    List(Vec<String>),
}

impl MetaValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetaValue::Text(s) => Some(s),
            MetaValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            MetaValue::List(items) => Some(items),
            MetaValue::Text(_) => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Text(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::Text(s)
    }
}

impl From<Vec<String>> for MetaValue {
    fn from(items: Vec<String>) -> Self {
        MetaValue::List(items)
    }
}

/// Well-known metadata keys.
pub mod keys {
    pub const KIND: &str = "kind";
    pub const CATEGORY: &str = "category";
    pub const SUBCATEGORY: &str = "subcategory";
    pub const SUB_LEVELS: &str = "sub_levels";
    pub const TOPIC: &str = "topic";
    pub const AUTHOR: &str = "author";
    pub const KEYWORDS: &str = "keywords";
    pub const FILE: &str = "file";
    pub const CLASSIFICATION: &str = "classification";
    pub const URL: &str = "url";
    pub const VIDEO_ID: &str = "video_id";
    pub const LANGUAGE: &str = "language";
}

/// Flat, ordered key/value annotation attached to a knowledge item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataBag(BTreeMap<String, MetaValue>);

impl MetadataBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a bag with the `kind` discriminator set.
    pub fn for_kind(kind: ItemKind) -> Self {
        let mut bag = Self::new();
        bag.insert(keys::KIND, kind.as_str());
        bag
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.0.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(MetaValue::as_text)
    }

    /// Merge another bag into this one. Keys in `other` win.
    pub fn merge(&mut self, other: MetadataBag) {
        self.0.extend(other.0);
    }

    /// The item kind recorded in this bag, if any.
    pub fn kind(&self) -> Option<ItemKind> {
        self.text(keys::KIND).and_then(ItemKind::from_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetaValue)> {
        self.0.iter()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}

/// The unit committed to the knowledge store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeItem {
    /// Display name. Also the store's identity for skip-if-exists.
    pub name: String,
    pub text: String,
    pub metadata: MetadataBag,
}

impl KnowledgeItem {
    pub fn new(name: impl Into<String>, text: impl Into<String>, metadata: MetadataBag) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            metadata,
        }
    }

    pub fn kind(&self) -> Option<ItemKind> {
        self.metadata.kind()
    }
}

/// A knowledge item as persisted by a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredItem {
    pub id: ItemId,
    pub kind: ItemKind,
    pub name: String,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

impl StoredItem {
    pub fn new(kind: ItemKind, name: impl Into<String>, content_hash: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            kind,
            name: name.into(),
            content_hash: content_hash.into(),
            created_at: Utc::now(),
            metadata: serde_json::json!({}),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A chunk of text content for embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub item_id: ItemId,
    pub chunk_index: i32,
    pub content: String,
}

impl Chunk {
    pub fn new(item_id: ItemId, chunk_index: i32, content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            item_id,
            chunk_index,
            content: content.into(),
        }
    }
}

/// Structured tags returned by the content classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub topic: String,
    #[serde(default = "unknown_author")]
    pub author: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

fn unknown_author() -> String {
    "unknown".to_string()
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            topic: String::new(),
            author: unknown_author(),
            keywords: Vec::new(),
        }
    }
}

/// Statistics about the knowledge store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_items: i64,
    pub items_by_kind: std::collections::HashMap<String, i64>,
    pub total_chunks: i64,
    pub embedded_chunks: i64,
    pub database_size_bytes: i64,
}
