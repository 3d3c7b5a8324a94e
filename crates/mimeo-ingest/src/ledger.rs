//! Provenance ledger: stable item identifier to persisted artifact.
//!
//! Adapters consult the ledger before any expensive external call. An entry
//! exists only once its full content is known, so a present entry always
//! means "already extracted".

use crate::error::IngestResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::debug;

pub trait Ledger<T>: Send + Sync {
    /// The recorded artifact for `key`, if one exists.
    fn lookup(&self, key: &str) -> IngestResult<Option<T>>;

    /// Persist `entry` under `key`, replacing any previous entry whole.
    fn record(&self, key: &str, entry: &T) -> IngestResult<()>;

    /// All recorded keys, sorted.
    fn keys(&self) -> IngestResult<Vec<String>>;

    /// Where the artifact for `key` lives.
    fn location(&self, key: &str) -> PathBuf;
}

/// Opens the ledger of one partition, such as one creator's artifacts.
pub type LedgerFactory<T> = Arc<dyn Fn(&str) -> Arc<dyn Ledger<T>> + Send + Sync>;

/// One [`FsLedger`] per partition, in `<root>/<partition>/`.
pub fn fs_partitions<T>(root: impl Into<PathBuf>) -> LedgerFactory<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    let root = root.into();
    Arc::new(move |partition: &str| -> Arc<dyn Ledger<T>> { Arc::new(FsLedger::<T>::new(root.join(partition))) })
}

/// Ledger of pretty-printed JSON files, one `<key>.json` per entry.
pub struct FsLedger<T> {
    dir: PathBuf,
    _entry: PhantomData<fn() -> T>,
}

impl<T> FsLedger<T> {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            _entry: PhantomData,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl<T> Ledger<T> for FsLedger<T>
where
    T: Serialize + DeserializeOwned,
{
    fn lookup(&self, key: &str) -> IngestResult<Option<T>> {
        let path = self.location(key);
        if !path.is_file() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn record(&self, key: &str, entry: &T) -> IngestResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.location(key);

        let mut json = serde_json::to_string_pretty(entry)?;
        json.push('\n');

        // Write beside the target then rename over it
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!("Recorded artifact {}", path.display());
        Ok(())
    }

    fn keys(&self) -> IngestResult<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn location(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Entry {
        text: String,
    }

    #[test]
    fn test_lookup_missing() {
        let dir = tempfile::tempdir().unwrap();
        let ledger: FsLedger<Entry> = FsLedger::new(dir.path());
        assert!(ledger.lookup("absent").unwrap().is_none());
    }

    #[test]
    fn test_record_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FsLedger::new(dir.path().join("nested"));

        let entry = Entry { text: "olá".into() };
        ledger.record("intro", &entry).unwrap();

        assert_eq!(ledger.lookup("intro").unwrap(), Some(entry));
        assert!(ledger.location("intro").ends_with("nested/intro.json"));
    }

    #[test]
    fn test_rewrite_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FsLedger::new(dir.path());
        let entry = Entry { text: "same".into() };

        ledger.record("k", &entry).unwrap();
        let first = std::fs::read(ledger.location("k")).unwrap();
        ledger.record("k", &entry).unwrap();
        let second = std::fs::read(ledger.location("k")).unwrap();

        assert_eq!(first, second);
        // No temp files left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_keys_sorted_json_only() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FsLedger::new(dir.path());
        ledger.record("b", &Entry { text: "2".into() }).unwrap();
        ledger.record("a", &Entry { text: "1".into() }).unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"video").unwrap();

        assert_eq!(ledger.keys().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_partitions_are_separate_directories() {
        let dir = tempfile::tempdir().unwrap();
        let ledgers = fs_partitions::<Entry>(dir.path());

        ledgers("ana").record("ep1", &Entry { text: "a".into() }).unwrap();
        ledgers("bia").record("ep1", &Entry { text: "b".into() }).unwrap();

        assert!(dir.path().join("ana/ep1.json").is_file());
        assert_eq!(ledgers("bia").lookup("ep1").unwrap(), Some(Entry { text: "b".into() }));
        assert!(ledgers("cid").keys().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_entry_is_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        let ledger: FsLedger<Entry> = FsLedger::new(dir.path());
        assert!(ledger.lookup("bad").is_err());
    }
}
