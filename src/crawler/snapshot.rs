use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};

/// Raw page snapshots for debugging selector drift
///
/// Each fetched page is written to `<dir>/<sha256(url)>.html`. Snapshots are
/// best effort: a failed write is logged and the crawl continues.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a snapshot of `url` is written to
    pub fn path_for(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        self.dir.join(format!("{}.html", hex::encode(digest)))
    }

    /// Writes the snapshot, creating the directory as needed
    pub async fn save(&self, url: &str, html: &str) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(url);
        tokio::fs::write(&path, html).await?;
        Ok(path)
    }

    /// Like [`save`](Self::save), but only logs failures
    pub async fn record(&self, url: &str, html: &str) {
        match self.save(url, html).await {
            Ok(path) => tracing::trace!(url, path = %path.display(), "Saved snapshot"),
            Err(e) => tracing::warn!(url, dir = %self.dir.display(), "Failed to save snapshot: {}", e),
        }
    }
}
