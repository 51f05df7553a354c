//! Snapshot cache: first run downloads, later runs reuse the file.

mod common;

use common::{serve, Reply};
use tempfile::TempDir;
use vvsearch::{ProgressEvent, RecordSource, SearchError, SnapshotCache, SnapshotSource, SubtitleDatabase, SubtitleRecord};

fn snapshot_bytes() -> Vec<u8> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("source.db");
    let db = SubtitleDatabase::create(&path).unwrap();
    db.insert_records(&[
        SubtitleRecord::new("[P01] a", "1s", 0.5, "first"),
        SubtitleRecord::new("[P02] b", "2s", 0.6, "second"),
    ])
    .unwrap();
    drop(db);
    std::fs::read(&path).unwrap()
}

#[tokio::test]
async fn downloads_once_then_serves_from_cache() {
    let server = serve(Reply::ok(snapshot_bytes())).await;
    let cache_dir = TempDir::new().unwrap();
    let cache = SnapshotCache::new(cache_dir.path(), format!("{}/subtitles.db", server.base_url), "1.0");

    let mut events = Vec::new();
    let (_, source) = cache.ensure(|e| events.push(e)).await.unwrap();
    assert_eq!(source, SnapshotSource::Download);
    assert_eq!(events.last(), Some(&ProgressEvent::Completed));
    assert!(events
        .iter()
        .any(|e| matches!(e, ProgressEvent::Advanced { percent, .. } if *percent == 100.0)));
    assert_eq!(cache.cached_version().as_deref(), Some("1.0"));

    let db = cache.open(|_| {}).await.unwrap();
    let texts: Vec<String> = db.fetch_all().unwrap().into_iter().map(|r| r.text).collect();
    assert_eq!(texts, vec!["first", "second"]);

    // second run: no request reaches the server
    let (_, source) = cache.ensure(|_| {}).await.unwrap();
    assert_eq!(source, SnapshotSource::Cache);
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn version_bump_forces_a_fresh_download() {
    let server = serve(Reply::ok(snapshot_bytes())).await;
    let cache_dir = TempDir::new().unwrap();
    let url = format!("{}/subtitles.db", server.base_url);

    SnapshotCache::new(cache_dir.path(), url.clone(), "1.0")
        .ensure(|_| {})
        .await
        .unwrap();
    let (_, source) = SnapshotCache::new(cache_dir.path(), url, "2.0")
        .ensure(|_| {})
        .await
        .unwrap();
    assert_eq!(source, SnapshotSource::Download);
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn failed_download_leaves_no_snapshot() {
    let server = serve(Reply::status(404)).await;
    let cache_dir = TempDir::new().unwrap();
    let cache = SnapshotCache::new(cache_dir.path(), format!("{}/subtitles.db", server.base_url), "1.0");

    let err = cache.ensure(|_| {}).await.unwrap_err();
    assert!(matches!(err, SearchError::DataUnavailable(_)));
    assert!(!cache.snapshot_path().exists());
    assert_eq!(cache.cached_version(), None);
}
