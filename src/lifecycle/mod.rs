//! Video lifecycle: discovery, change detection and the status machine.
//!
//! A scan walks the library, reconciles what it finds with the catalog and
//! drives each video through [`VideoStatus`] via [`LifecycleEvent`]s:
//!
//! - unknown files are added as NEW and probed (READY or ERROR)
//! - changed files are re-probed, so a stale TRANSCRIBED video drops to READY
//! - files that reappear after being MISSING are re-probed the same way
//! - catalogued files that are gone from disk become MISSING

mod scanner;
mod status;

pub use scanner::{has_video_extension, scan_directory, FileStat};
pub use status::{LifecycleEvent, VideoStatus};

use crate::catalog::{Catalog, Video};
use crate::error::{Result, VidscribeError};
use crate::probe::MetadataProbe;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// What a scan did to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Discovered,
    Changed,
    Restored,
    Unchanged,
    /// Being processed elsewhere; left alone this round.
    Skipped,
}

/// Counts from one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub discovered: usize,
    pub changed: usize,
    pub restored: usize,
    pub unchanged: usize,
    pub missing: usize,
    /// Videos whose metadata extraction failed during this scan.
    pub failed: usize,
    pub skipped: usize,
    /// Ids of videos first seen in this scan, in discovery order.
    #[serde(skip)]
    pub discovered_ids: Vec<i64>,
    /// Ids counted in `failed`; their metadata was already attempted this run.
    #[serde(skip)]
    pub failed_ids: Vec<i64>,
}

impl ScanSummary {
    fn record(&mut self, outcome: ScanOutcome, video: Option<&Video>) {
        match outcome {
            ScanOutcome::Discovered => {
                self.discovered += 1;
                if let Some(video) = video {
                    self.discovered_ids.push(video.id);
                }
            }
            ScanOutcome::Changed => self.changed += 1,
            ScanOutcome::Restored => self.restored += 1,
            ScanOutcome::Unchanged => self.unchanged += 1,
            ScanOutcome::Skipped => self.skipped += 1,
        }
        if let Some(video) = video {
            if outcome != ScanOutcome::Unchanged && video.status == VideoStatus::Error {
                self.failed += 1;
                self.failed_ids.push(video.id);
            }
        }
    }
}

/// Reconciles the filesystem with the catalog.
pub struct LifecycleManager {
    catalog: Arc<Catalog>,
    probe: Arc<dyn MetadataProbe>,
}

impl LifecycleManager {
    pub fn new(catalog: Arc<Catalog>, probe: Arc<dyn MetadataProbe>) -> Self {
        Self { catalog, probe }
    }

    /// Scan a library directory and update the catalog.
    #[instrument(skip(self, extensions))]
    pub async fn scan(
        &self,
        root: &Path,
        extensions: &[String],
        follow_links: bool,
    ) -> Result<ScanSummary> {
        let found = scan_directory(root, extensions, follow_links)?;
        info!("Scanning {} video files", found.len());

        let mut summary = ScanSummary::default();
        let mut seen: HashSet<PathBuf> = HashSet::new();

        for (path, stat) in found {
            seen.insert(path.clone());
            let (outcome, video) = self.observe(&path, stat).await?;
            summary.record(outcome, video.as_ref());
        }

        for video in self.catalog.list_videos(None)? {
            if video.status == VideoStatus::Missing || seen.contains(&video.path) {
                continue;
            }
            // Filtered out or outside this root, but still on disk.
            if video.path.exists() {
                continue;
            }

            let _lock = match self.catalog.try_lock_video(video.id) {
                Ok(lock) => lock,
                Err(VidscribeError::LockContention(_)) => {
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            self.catalog.mark_missing(video.id)?;
            summary.missing += 1;
        }

        info!(
            discovered = summary.discovered,
            changed = summary.changed,
            restored = summary.restored,
            missing = summary.missing,
            failed = summary.failed,
            "Scan complete"
        );
        Ok(summary)
    }

    /// Register or refresh a single file without touching the rest of the catalog.
    #[instrument(skip(self))]
    pub async fn scan_file(&self, path: &Path) -> Result<(ScanOutcome, Option<Video>)> {
        let path = path.canonicalize().map_err(|e| {
            VidscribeError::InvalidInput(format!("Cannot open {}: {}", path.display(), e))
        })?;
        if !path.is_file() {
            return Err(VidscribeError::InvalidInput(format!(
                "Not a file: {}",
                path.display()
            )));
        }
        let stat = FileStat::from_path(&path)?;
        self.observe(&path, stat).await
    }

    /// Probe a video's file and record the result.
    ///
    /// Probe failures land on the video as ERROR with a message; only
    /// failures that are not about this file (missing ffprobe, database) are
    /// returned as errors. The caller must hold the video's processing lock.
    pub async fn extract_metadata(&self, video: &Video, stat: &FileStat) -> Result<Video> {
        match self.probe.probe(&video.path).await {
            Ok(metadata) => self.catalog.record_metadata(video.id, stat, &metadata),
            Err(e) if e.is_per_video() => {
                self.catalog
                    .record_metadata_failure(video.id, Some(stat), &e.to_string())
            }
            Err(e) => Err(e),
        }
    }

    async fn observe(&self, path: &Path, stat: FileStat) -> Result<(ScanOutcome, Option<Video>)> {
        let (video, outcome) = match self.catalog.find_video_by_path(path)? {
            None => (
                self.catalog.insert_new_video(path, &stat)?,
                ScanOutcome::Discovered,
            ),
            Some(video) if video.status == VideoStatus::Missing => (video, ScanOutcome::Restored),
            Some(video) if video.status == VideoStatus::New => (video, ScanOutcome::Changed),
            Some(video)
                if video.size_bytes != stat.size_bytes || video.modified_at != stat.modified_at =>
            {
                (video, ScanOutcome::Changed)
            }
            Some(video) => {
                self.catalog.touch_seen(video.id)?;
                return Ok((ScanOutcome::Unchanged, Some(video)));
            }
        };

        let _lock = match self.catalog.try_lock_video(video.id) {
            Ok(lock) => lock,
            Err(VidscribeError::LockContention(_)) => {
                warn!("Skipping {:?}: being processed", path);
                return Ok((ScanOutcome::Skipped, None));
            }
            Err(e) => return Err(e),
        };

        let updated = self.extract_metadata(&video, &stat).await?;
        Ok((outcome, Some(updated)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::VideoMetadata;
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// Succeeds unless the file name contains "corrupt".
    struct FakeProbe;

    #[async_trait]
    impl MetadataProbe for FakeProbe {
        async fn probe(&self, path: &Path) -> Result<VideoMetadata> {
            if path.to_string_lossy().contains("corrupt") {
                return Err(VidscribeError::Probe("invalid data found".into()));
            }
            Ok(VideoMetadata {
                duration_seconds: 10.0,
                width: 1280,
                height: 720,
                codec: "h264".to_string(),
                bitrate: Some(1_000_000),
                fps: Some(30.0),
            })
        }
    }

    struct MissingToolProbe;

    #[async_trait]
    impl MetadataProbe for MissingToolProbe {
        async fn probe(&self, _path: &Path) -> Result<VideoMetadata> {
            Err(VidscribeError::ToolNotFound("ffprobe".into()))
        }
    }

    fn manager() -> (LifecycleManager, Arc<Catalog>) {
        let catalog = Arc::new(Catalog::in_memory().unwrap());
        (
            LifecycleManager::new(Arc::clone(&catalog), Arc::new(FakeProbe)),
            catalog,
        )
    }

    fn exts() -> Vec<String> {
        vec!["mp4".to_string()]
    }

    #[tokio::test]
    async fn test_first_scan_discovers_and_probes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("good.mp4"), b"data").unwrap();
        std::fs::write(dir.path().join("corrupt.mp4"), b"data").unwrap();
        let (manager, catalog) = manager();

        let summary = manager.scan(dir.path(), &exts(), false).await.unwrap();
        assert_eq!(summary.discovered, 2);
        assert_eq!(summary.failed, 1);

        let ready = catalog.list_videos(Some(VideoStatus::Ready)).unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].filename, "good.mp4");
        assert!(ready[0].metadata.is_some());

        let errored = catalog.list_videos(Some(VideoStatus::Error)).unwrap();
        assert_eq!(errored.len(), 1);
        assert_eq!(summary.failed_ids, vec![errored[0].id]);
        assert!(errored[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("invalid data"));
    }

    #[tokio::test]
    async fn test_rescan_is_stable() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"data").unwrap();
        let (manager, catalog) = manager();

        manager.scan(dir.path(), &exts(), false).await.unwrap();
        let summary = manager.scan(dir.path(), &exts(), false).await.unwrap();

        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.discovered, 0);
        assert_eq!(catalog.list_videos(None).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_changed_file_is_reprobed() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.mp4");
        std::fs::write(&file, b"data").unwrap();
        let (manager, catalog) = manager();

        manager.scan(dir.path(), &exts(), false).await.unwrap();
        std::fs::write(&file, b"much longer data").unwrap();
        let summary = manager.scan(dir.path(), &exts(), false).await.unwrap();

        assert_eq!(summary.changed, 1);
        let video = &catalog.list_videos(None).unwrap()[0];
        assert_eq!(video.size_bytes, 16);
        assert_eq!(video.status, VideoStatus::Ready);
    }

    #[tokio::test]
    async fn test_vanished_file_becomes_missing_and_restores_to_ready() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.mp4");
        std::fs::write(&file, b"data").unwrap();
        let (manager, catalog) = manager();

        manager.scan(dir.path(), &exts(), false).await.unwrap();
        std::fs::remove_file(&file).unwrap();

        let summary = manager.scan(dir.path(), &exts(), false).await.unwrap();
        assert_eq!(summary.missing, 1);
        assert_eq!(
            catalog.list_videos(None).unwrap()[0].status,
            VideoStatus::Missing
        );

        // Scanning again does not count it twice.
        let summary = manager.scan(dir.path(), &exts(), false).await.unwrap();
        assert_eq!(summary.missing, 0);

        std::fs::write(&file, b"data").unwrap();
        let summary = manager.scan(dir.path(), &exts(), false).await.unwrap();
        assert_eq!(summary.restored, 1);
        assert_eq!(
            catalog.list_videos(None).unwrap()[0].status,
            VideoStatus::Ready
        );
    }

    #[tokio::test]
    async fn test_locked_video_is_skipped() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.mp4");
        std::fs::write(&file, b"data").unwrap();
        let (manager, catalog) = manager();

        manager.scan(dir.path(), &exts(), false).await.unwrap();
        let video = catalog.list_videos(None).unwrap().remove(0);
        std::fs::write(&file, b"changed!").unwrap();

        let _held = catalog.try_lock_video(video.id).unwrap();
        let summary = manager.scan(dir.path(), &exts(), false).await.unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(catalog.get_video(video.id).unwrap().size_bytes, 4);
    }

    #[tokio::test]
    async fn test_missing_ffprobe_aborts_scan() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"data").unwrap();
        let catalog = Arc::new(Catalog::in_memory().unwrap());
        let manager = LifecycleManager::new(Arc::clone(&catalog), Arc::new(MissingToolProbe));

        let err = manager.scan(dir.path(), &exts(), false).await.unwrap_err();
        assert!(matches!(err, VidscribeError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn test_scan_single_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("one.mp4");
        std::fs::write(&file, b"data").unwrap();
        let (manager, _catalog) = manager();

        let (outcome, video) = manager.scan_file(&file).await.unwrap();
        assert_eq!(outcome, ScanOutcome::Discovered);
        assert_eq!(video.unwrap().status, VideoStatus::Ready);

        assert!(manager.scan_file(&dir.path().join("nope.mp4")).await.is_err());
    }
}
