//! Video rows and their status transitions.

use super::{path_key, video_from_row, Catalog, Video, VIDEO_COLUMNS};
use crate::error::{Result, VidscribeError};
use crate::lifecycle::{FileStat, LifecycleEvent, VideoStatus};
use crate::probe::VideoMetadata;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Move a video along the status table inside the caller's transaction.
pub(super) fn apply_event(
    conn: &Connection,
    video_id: i64,
    event: LifecycleEvent,
) -> Result<VideoStatus> {
    let current: String = conn
        .query_row(
            "SELECT status FROM videos WHERE id = ?1",
            params![video_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| VidscribeError::VideoNotFound(format!("id {}", video_id)))?;

    let current: VideoStatus = current.parse().map_err(VidscribeError::Catalog)?;
    let next = current.transition(event)?;

    conn.execute(
        "UPDATE videos SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![next.as_str(), Utc::now().to_rfc3339(), video_id],
    )?;

    debug!(video_id, from = %current, to = %next, ?event, "Status transition");
    Ok(next)
}

pub(super) fn load_video(conn: &Connection, video_id: i64) -> Result<Video> {
    conn.query_row(
        &format!("SELECT {} FROM videos WHERE id = ?1", VIDEO_COLUMNS),
        params![video_id],
        video_from_row,
    )
    .optional()?
    .ok_or_else(|| VidscribeError::VideoNotFound(format!("id {}", video_id)))
}

impl Catalog {
    pub fn get_video(&self, video_id: i64) -> Result<Video> {
        let conn = self.conn()?;
        load_video(&conn, video_id)
    }

    pub fn find_video_by_path(&self, path: &Path) -> Result<Option<Video>> {
        let conn = self.conn()?;
        let video = conn
            .query_row(
                &format!("SELECT {} FROM videos WHERE path = ?1", VIDEO_COLUMNS),
                params![path_key(path)],
                video_from_row,
            )
            .optional()?;
        Ok(video)
    }

    /// All videos, optionally restricted to one status, in catalog order.
    pub fn list_videos(&self, status: Option<VideoStatus>) -> Result<Vec<Video>> {
        let conn = self.conn()?;
        let videos = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM videos WHERE status = ?1 ORDER BY id",
                    VIDEO_COLUMNS
                ))?;
                let rows = stmt.query_map(params![status.as_str()], video_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("SELECT {} FROM videos ORDER BY id", VIDEO_COLUMNS))?;
                let rows = stmt.query_map([], video_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(videos)
    }

    /// Videos the orchestrator may pick up: READY first, then ERROR retries.
    pub fn transcribable_videos(&self) -> Result<Vec<Video>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM videos WHERE status IN ('ready', 'error')
             ORDER BY CASE status WHEN 'ready' THEN 0 ELSE 1 END, id",
            VIDEO_COLUMNS
        ))?;
        let rows = stmt.query_map([], video_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Record a newly discovered file in NEW status.
    #[instrument(skip(self, stat))]
    pub fn insert_new_video(&self, path: &Path, stat: &FileStat) -> Result<Video> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| path_key(path));

        conn.execute(
            "INSERT INTO videos (path, filename, size_bytes, modified_at, status, last_seen_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?6)",
            params![
                path_key(path),
                filename,
                stat.size_bytes as i64,
                stat.modified_at,
                VideoStatus::New.as_str(),
                now
            ],
        )?;

        let id = conn.last_insert_rowid();
        info!(video_id = id, "Discovered {:?}", path);
        load_video(&conn, id)
    }

    /// Store freshly extracted metadata and move the video to READY.
    ///
    /// Used for new files, changed files and files that reappeared after
    /// being MISSING. A previous transcription row is kept as history until a
    /// new one replaces it.
    #[instrument(skip(self, stat, metadata))]
    pub fn record_metadata(
        &self,
        video_id: i64,
        stat: &FileStat,
        metadata: &VideoMetadata,
    ) -> Result<Video> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        tx.execute(
            "UPDATE videos SET size_bytes = ?1, modified_at = ?2, duration_seconds = ?3,
                    width = ?4, height = ?5, resolution = ?6, codec = ?7, bitrate = ?8, fps = ?9,
                    error_message = NULL, last_seen_at = ?10
             WHERE id = ?11",
            params![
                stat.size_bytes as i64,
                stat.modified_at,
                metadata.duration_seconds,
                metadata.width,
                metadata.height,
                metadata.resolution(),
                metadata.codec,
                metadata.bitrate.map(|b| b as i64),
                metadata.fps,
                now,
                video_id
            ],
        )?;
        apply_event(&tx, video_id, LifecycleEvent::MetadataExtracted)?;

        let video = load_video(&tx, video_id)?;
        tx.commit()?;
        Ok(video)
    }

    /// Record a failed metadata extraction and move the video to ERROR.
    #[instrument(skip(self, stat))]
    pub fn record_metadata_failure(
        &self,
        video_id: i64,
        stat: Option<&FileStat>,
        message: &str,
    ) -> Result<Video> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        if let Some(stat) = stat {
            tx.execute(
                "UPDATE videos SET size_bytes = ?1, modified_at = ?2 WHERE id = ?3",
                params![stat.size_bytes as i64, stat.modified_at, video_id],
            )?;
        }
        tx.execute(
            "UPDATE videos SET error_message = ?1, last_seen_at = ?2 WHERE id = ?3",
            params![message, now, video_id],
        )?;
        apply_event(&tx, video_id, LifecycleEvent::MetadataFailed)?;

        let video = load_video(&tx, video_id)?;
        tx.commit()?;

        warn!(video_id, "Metadata extraction failed: {}", message);
        Ok(video)
    }

    /// Move a video whose file vanished to MISSING. Its transcription and
    /// artifact are retained.
    #[instrument(skip(self))]
    pub fn mark_missing(&self, video_id: i64) -> Result<Video> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        apply_event(&tx, video_id, LifecycleEvent::Vanished)?;
        let video = load_video(&tx, video_id)?;
        tx.commit()?;

        info!(video_id, "Marked {:?} as missing", video.path);
        Ok(video)
    }

    /// Note that a scan saw the file unchanged.
    pub fn touch_seen(&self, video_id: i64) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE videos SET last_seen_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), video_id],
        )?;
        if updated == 0 {
            return Err(VidscribeError::VideoNotFound(format!("id {}", video_id)));
        }
        Ok(())
    }

    /// Record a failed processing attempt and move the video to ERROR.
    #[instrument(skip(self))]
    pub fn record_transcription_failure(&self, video_id: i64, message: &str) -> Result<Video> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "UPDATE videos SET error_message = ?1 WHERE id = ?2",
            params![message, video_id],
        )?;
        apply_event(&tx, video_id, LifecycleEvent::TranscriptionFailed)?;

        let video = load_video(&tx, video_id)?;
        tx.commit()?;

        warn!(video_id, "Processing failed: {}", message);
        Ok(video)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn stat(size: u64) -> FileStat {
        FileStat {
            size_bytes: size,
            modified_at: 1_700_000_000_000,
        }
    }

    fn metadata() -> VideoMetadata {
        VideoMetadata {
            duration_seconds: 12.5,
            width: 1920,
            height: 1080,
            codec: "h264".to_string(),
            bitrate: Some(4_000_000),
            fps: Some(29.97),
        }
    }

    #[test]
    fn test_discovered_video_starts_new() {
        let catalog = Catalog::in_memory().unwrap();
        let path = PathBuf::from("/videos/a.mp4");

        let video = catalog.insert_new_video(&path, &stat(10)).unwrap();
        assert_eq!(video.status, VideoStatus::New);
        assert_eq!(video.filename, "a.mp4");
        assert!(video.metadata.is_none());

        let found = catalog.find_video_by_path(&path).unwrap().unwrap();
        assert_eq!(found.id, video.id);
    }

    #[test]
    fn test_duplicate_path_is_rejected() {
        let catalog = Catalog::in_memory().unwrap();
        let path = PathBuf::from("/videos/a.mp4");
        catalog.insert_new_video(&path, &stat(10)).unwrap();
        assert!(catalog.insert_new_video(&path, &stat(10)).is_err());
    }

    #[test]
    fn test_metadata_moves_video_to_ready() {
        let catalog = Catalog::in_memory().unwrap();
        let video = catalog
            .insert_new_video(Path::new("/videos/a.mp4"), &stat(10))
            .unwrap();

        let video = catalog.record_metadata(video.id, &stat(20), &metadata()).unwrap();
        assert_eq!(video.status, VideoStatus::Ready);
        assert_eq!(video.size_bytes, 20);
        let meta = video.metadata.unwrap();
        assert_eq!(meta.codec, "h264");
        assert_eq!(meta.bitrate, Some(4_000_000));
        assert_eq!(meta.resolution(), "1920x1080");
    }

    #[test]
    fn test_failure_records_message_and_success_clears_it() {
        let catalog = Catalog::in_memory().unwrap();
        let video = catalog
            .insert_new_video(Path::new("/videos/a.mp4"), &stat(10))
            .unwrap();

        let failed = catalog
            .record_metadata_failure(video.id, None, "moov atom not found")
            .unwrap();
        assert_eq!(failed.status, VideoStatus::Error);
        assert_eq!(failed.error_message.as_deref(), Some("moov atom not found"));

        let ready = catalog.record_metadata(video.id, &stat(10), &metadata()).unwrap();
        assert_eq!(ready.status, VideoStatus::Ready);
        assert!(ready.error_message.is_none());
    }

    #[test]
    fn test_transcription_failure_from_new_is_rejected() {
        let catalog = Catalog::in_memory().unwrap();
        let video = catalog
            .insert_new_video(Path::new("/videos/a.mp4"), &stat(10))
            .unwrap();

        let err = catalog
            .record_transcription_failure(video.id, "boom")
            .unwrap_err();
        assert!(matches!(err, VidscribeError::InvalidTransition { .. }));

        // Nothing was written.
        let video = catalog.get_video(video.id).unwrap();
        assert_eq!(video.status, VideoStatus::New);
        assert!(video.error_message.is_none());
    }

    #[test]
    fn test_list_and_transcribable_order() {
        let catalog = Catalog::in_memory().unwrap();
        let a = catalog.insert_new_video(Path::new("/v/a.mp4"), &stat(1)).unwrap();
        let b = catalog.insert_new_video(Path::new("/v/b.mp4"), &stat(1)).unwrap();
        let c = catalog.insert_new_video(Path::new("/v/c.mp4"), &stat(1)).unwrap();

        catalog.record_metadata_failure(a.id, None, "bad").unwrap();
        catalog.record_metadata(b.id, &stat(1), &metadata()).unwrap();
        catalog.mark_missing(c.id).unwrap();

        let ids: Vec<i64> = catalog
            .transcribable_videos()
            .unwrap()
            .iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(ids, vec![b.id, a.id]);

        let missing = catalog.list_videos(Some(VideoStatus::Missing)).unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].id, c.id);
        assert_eq!(catalog.list_videos(None).unwrap().len(), 3);
    }

    #[test]
    fn test_unknown_video() {
        let catalog = Catalog::in_memory().unwrap();
        assert!(matches!(
            catalog.get_video(42).unwrap_err(),
            VidscribeError::VideoNotFound(_)
        ));
        assert!(catalog.touch_seen(42).is_err());
    }
}
