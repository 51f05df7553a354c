//! Snapshot download and cache for the local pipeline.
//!
//! The snapshot is fetched once and kept in the per-user cache directory next
//! to a marker holding the dataset version it was fetched for. A matching
//! marker means the cached file is reused; anything else triggers a fresh
//! download. The marker is written last, so an interrupted download is never
//! mistaken for a complete one.

use crate::database::SubtitleDatabase;
use crate::error::{SearchError, SearchResult};
use crate::progress::{ByteProgress, ProgressEvent};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

const SNAPSHOT_FILE: &str = "subtitles.db";
const VERSION_FILE: &str = "subtitles.version";

/// Where a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    Cache,
    Download,
}

pub struct SnapshotCache {
    dir: PathBuf,
    url: String,
    version: String,
    client: reqwest::Client,
}

impl SnapshotCache {
    pub fn new(dir: impl Into<PathBuf>, url: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            url: url.into(),
            version: version.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Per-user cache directory, e.g. `~/.cache/vvsearch` on Linux.
    pub fn default_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "vvsearch").map(|dirs| dirs.cache_dir().to_path_buf())
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    fn version_path(&self) -> PathBuf {
        self.dir.join(VERSION_FILE)
    }

    /// Version recorded next to the cached snapshot, if both exist.
    pub fn cached_version(&self) -> Option<String> {
        if !self.snapshot_path().is_file() {
            return None;
        }
        std::fs::read_to_string(self.version_path())
            .ok()
            .map(|v| v.trim().to_string())
    }

    pub fn is_current(&self) -> bool {
        self.cached_version().as_deref() == Some(self.version.as_str())
    }

    /// Make sure a current snapshot is on disk and return its path.
    pub async fn ensure<F>(&self, mut on_progress: F) -> SearchResult<(PathBuf, SnapshotSource)>
    where
        F: FnMut(ProgressEvent) + Send,
    {
        if self.is_current() {
            tracing::info!(path = %self.snapshot_path().display(), version = %self.version, "using cached snapshot");
            on_progress(ProgressEvent::Completed);
            return Ok((self.snapshot_path(), SnapshotSource::Cache));
        }

        tracing::info!(
            url = %self.url,
            cached = ?self.cached_version(),
            wanted = %self.version,
            "downloading snapshot"
        );
        tokio::fs::create_dir_all(&self.dir).await?;
        // Stale marker first: a crash below must not leave an old marker beside a new file.
        remove_if_exists(&self.version_path()).await?;

        let partial = self.dir.join(format!("{SNAPSHOT_FILE}.part"));
        if let Err(e) = self.download_to(&partial, &mut on_progress).await {
            let _ = remove_if_exists(&partial).await;
            return Err(e);
        }
        tokio::fs::rename(&partial, self.snapshot_path()).await?;
        tokio::fs::write(self.version_path(), &self.version).await?;

        on_progress(ProgressEvent::Completed);
        Ok((self.snapshot_path(), SnapshotSource::Download))
    }

    /// `ensure`, then open the snapshot read-only.
    pub async fn open<F>(&self, on_progress: F) -> SearchResult<SubtitleDatabase>
    where
        F: FnMut(ProgressEvent) + Send,
    {
        let (path, _) = self.ensure(on_progress).await?;
        SubtitleDatabase::open_snapshot(path)
    }

    async fn download_to<F>(&self, path: &Path, on_progress: &mut F) -> SearchResult<()>
    where
        F: FnMut(ProgressEvent) + Send,
    {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::DataUnavailable(format!(
                "snapshot download returned HTTP {status}"
            )));
        }

        let mut progress = ByteProgress::new(response.content_length());
        let mut file = tokio::fs::File::create(path).await?;
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            progress.record(chunk.len());
            on_progress(progress.event(progress.percent()));
        }
        file.flush().await?;

        tracing::info!(bytes = progress.received(), "snapshot downloaded");
        Ok(())
    }
}

async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubtitleRecord;
    use crate::database::RecordSource;

    // Port 9 (discard) is closed on test hosts, so downloads fail fast.
    const UNREACHABLE: &str = "http://127.0.0.1:9/subtitles.db";

    fn seed(dir: &Path, version: &str) {
        SubtitleDatabase::create(dir.join(SNAPSHOT_FILE))
            .unwrap()
            .insert_records(&[SubtitleRecord::new("[P01] a", "1s", 0.5, "cached line")])
            .unwrap();
        std::fs::write(dir.join(VERSION_FILE), version).unwrap();
    }

    #[tokio::test]
    async fn matching_marker_reuses_cache() {
        let dir = tempfile::TempDir::new().unwrap();
        seed(dir.path(), "1.0");

        let cache = SnapshotCache::new(dir.path(), UNREACHABLE, "1.0");
        assert!(cache.is_current());
        let mut events = Vec::new();
        let (path, source) = cache.ensure(|e| events.push(e)).await.unwrap();
        assert_eq!(source, SnapshotSource::Cache);
        assert_eq!(path, dir.path().join(SNAPSHOT_FILE));
        assert_eq!(events, vec![ProgressEvent::Completed]);

        let db = cache.open(|_| {}).await.unwrap();
        assert_eq!(db.fetch_all().unwrap()[0].text, "cached line");
    }

    #[tokio::test]
    async fn version_mismatch_downloads_and_reports_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        seed(dir.path(), "0.9");

        let cache = SnapshotCache::new(dir.path(), UNREACHABLE, "1.0");
        assert!(!cache.is_current());
        let err = cache.ensure(|_| {}).await.unwrap_err();
        assert!(matches!(err, SearchError::DataUnavailable(_)));
        // marker dropped so the stale file is never trusted again
        assert_eq!(cache.cached_version(), None);
        assert!(!dir.path().join("subtitles.db.part").exists());
    }

    #[test]
    fn marker_without_snapshot_is_not_current() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(VERSION_FILE), "1.0").unwrap();
        let cache = SnapshotCache::new(dir.path(), UNREACHABLE, "1.0");
        assert_eq!(cache.cached_version(), None);
    }
}
