use crate::history::{HistoryError, HistoryResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// On-disk format version
pub const HISTORY_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct HistoryDocument {
    version: u32,
    urls: Vec<String>,
}

/// Set of already-accepted article URLs backed by a JSON file
///
/// The store assumes a single writer: two processes pointed at the same file
/// will overwrite each other's additions.
#[derive(Debug)]
pub struct CrawlHistoryStore {
    path: PathBuf,
    urls: BTreeSet<String>,
}

impl CrawlHistoryStore {
    /// Creates an empty store that will persist to `path`
    ///
    /// Nothing is read from disk; call [`load_from_disk`](Self::load_from_disk)
    /// or use [`open`](Self::open) to pick up an existing history.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            urls: BTreeSet::new(),
        }
    }

    /// Creates a store and loads whatever history already exists at `path`
    pub fn open(path: impl Into<PathBuf>) -> HistoryResult<Self> {
        let mut store = Self::new(path);
        store.load_from_disk()?;
        Ok(store)
    }

    /// Replaces the in-memory set with the contents of the history file
    ///
    /// # Returns
    ///
    /// * `Ok(n)` - Number of URLs loaded; a missing file loads zero
    /// * `Err(HistoryError)` - The file exists but could not be read or parsed
    pub fn load_from_disk(&mut self) -> HistoryResult<usize> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No history file yet; starting empty");
                self.urls.clear();
                return Ok(0);
            }
            Err(e) => return Err(e.into()),
        };

        let document: HistoryDocument = serde_json::from_str(&raw)?;
        if document.version != HISTORY_VERSION {
            return Err(HistoryError::UnsupportedVersion {
                found: document.version,
                expected: HISTORY_VERSION,
            });
        }

        self.urls = document.urls.into_iter().collect();
        tracing::info!(
            path = %self.path.display(),
            urls = self.urls.len(),
            "Loaded crawl history"
        );
        Ok(self.urls.len())
    }

    /// Returns true if `url` has already been accepted
    pub fn seen(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Records `url` in memory; returns false if it was already present
    pub fn add(&mut self, url: impl Into<String>) -> bool {
        self.urls.insert(url.into())
    }

    /// Forgets `url` in memory; returns false if it was not present
    pub fn remove(&mut self, url: &str) -> bool {
        self.urls.remove(url)
    }

    /// Forgets every URL in memory (the file is untouched until persist)
    pub fn clear(&mut self) {
        self.urls.clear();
    }

    /// Writes the history atomically
    ///
    /// The document is written to a temporary file in the target directory,
    /// flushed to disk and renamed over the target, so readers never observe
    /// a half-written file.
    pub fn persist(&self) -> HistoryResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let document = HistoryDocument {
            version: HISTORY_VERSION,
            urls: self.urls.iter().cloned().collect(),
        };

        let mut temp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut temp, &document)?;
        temp.write_all(b"\n")?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path)?;

        tracing::debug!(path = %self.path.display(), urls = self.urls.len(), "Persisted crawl history");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Iterates the stored URLs in sorted order
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_add_then_seen() {
        let mut store = CrawlHistoryStore::new("unused.json");
        assert!(!store.seen("https://news.example.com/a/1"));

        assert!(store.add("https://news.example.com/a/1"));
        assert!(store.seen("https://news.example.com/a/1"));
        assert!(!store.add("https://news.example.com/a/1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_forgets_url() {
        let mut store = CrawlHistoryStore::new("unused.json");
        store.add("https://news.example.com/a/1");

        assert!(store.remove("https://news.example.com/a/1"));
        assert!(!store.seen("https://news.example.com/a/1"));
        assert!(!store.remove("https://news.example.com/a/1"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_missing_file_is_empty_history() {
        let dir = TempDir::new().unwrap();
        let store = CrawlHistoryStore::open(dir.path().join("history.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_persist_and_reload_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");

        let mut store = CrawlHistoryStore::new(&path);
        store.add("https://news.example.com/b");
        store.add("https://news.example.com/a");
        store.add("https://news.example.com/c?id=7");
        store.persist().unwrap();

        let reloaded = CrawlHistoryStore::open(&path).unwrap();
        let original: Vec<&str> = store.urls().collect();
        let restored: Vec<&str> = reloaded.urls().collect();
        assert_eq!(original, restored);
    }

    #[test]
    fn test_persisted_document_is_sorted_and_versioned() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");

        let mut store = CrawlHistoryStore::new(&path);
        store.add("https://z.example.com/");
        store.add("https://a.example.com/");
        store.persist().unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(
            value["urls"],
            serde_json::json!(["https://a.example.com/", "https://z.example.com/"])
        );
    }

    #[test]
    fn test_persist_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("nested").join("history.json");

        let mut store = CrawlHistoryStore::new(&path);
        store.add("https://news.example.com/a");
        store.persist().unwrap();

        assert!(path.exists());
        // Only the target remains; the temp file was renamed over it
        let entries = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{ not json").unwrap();

        let result = CrawlHistoryStore::open(&path);
        assert!(matches!(result, Err(HistoryError::Serialization(_))));
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, r#"{"version": 9, "urls": []}"#).unwrap();

        let result = CrawlHistoryStore::open(&path);
        assert!(matches!(
            result,
            Err(HistoryError::UnsupportedVersion { found: 9, .. })
        ));
    }

    #[test]
    fn test_clear_then_persist_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");

        let mut store = CrawlHistoryStore::new(&path);
        store.add("https://news.example.com/a");
        store.persist().unwrap();

        store.clear();
        store.persist().unwrap();

        assert!(CrawlHistoryStore::open(&path).unwrap().is_empty());
    }
}
