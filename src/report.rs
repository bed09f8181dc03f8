//! Read-only catalog snapshot for reporting.

use crate::catalog::{Catalog, KeywordUsage, Transcription, Video};
use crate::error::Result;
use crate::lifecycle::VideoStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, instrument};

/// A transcription together with the display forms of its keywords.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionEntry {
    #[serde(flatten)]
    pub transcription: Transcription,
    pub keywords: Vec<String>,
}

/// Everything in the catalog at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogSnapshot {
    pub generated_at: DateTime<Utc>,
    pub schema_version: u32,
    /// Count per status, including statuses with no videos.
    pub status_counts: BTreeMap<String, usize>,
    pub videos: Vec<Video>,
    pub transcriptions: Vec<TranscriptionEntry>,
    pub keywords: Vec<KeywordUsage>,
    pub consistency_issues: Vec<String>,
}

impl CatalogSnapshot {
    /// Read the whole catalog.
    #[instrument(skip(catalog))]
    pub fn capture(catalog: &Catalog) -> Result<Self> {
        let videos = catalog.list_videos(None)?;

        let mut status_counts: BTreeMap<String, usize> = VideoStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        for video in &videos {
            *status_counts
                .entry(video.status.as_str().to_string())
                .or_default() += 1;
        }

        let transcriptions = catalog
            .list_transcriptions()?
            .into_iter()
            .map(|transcription| {
                let keywords = catalog
                    .transcription_keywords(transcription.id)?
                    .into_iter()
                    .map(|k| k.display)
                    .collect();
                Ok(TranscriptionEntry {
                    transcription,
                    keywords,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            generated_at: Utc::now(),
            schema_version: catalog.schema_version()?,
            status_counts,
            videos,
            transcriptions,
            keywords: catalog.list_keywords_with_usage()?,
            consistency_issues: catalog.consistency_issues()?,
        })
    }

    /// The `limit` most used keywords that are used at all.
    pub fn top_keywords(&self, limit: usize) -> Vec<&KeywordUsage> {
        self.keywords
            .iter()
            .filter(|k| k.usage_count > 0)
            .take(limit)
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the snapshot as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        info!("Wrote catalog snapshot to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NewTranscription;
    use crate::lifecycle::FileStat;
    use crate::probe::VideoMetadata;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn metadata() -> VideoMetadata {
        VideoMetadata {
            duration_seconds: 10.0,
            width: 640,
            height: 480,
            codec: "h264".to_string(),
            bitrate: None,
            fps: None,
        }
    }

    #[test]
    fn test_snapshot_counts_and_keywords() {
        let dir = TempDir::new().unwrap();
        let catalog = Catalog::in_memory().unwrap();
        let stat = FileStat {
            size_bytes: 10,
            modified_at: 1,
        };

        let a = catalog.insert_new_video(Path::new("/v/a.mp4"), &stat).unwrap();
        let b = catalog.insert_new_video(Path::new("/v/b.mp4"), &stat).unwrap();
        catalog.insert_new_video(Path::new("/v/c.mp4"), &stat).unwrap();
        catalog.record_metadata(a.id, &stat, &metadata()).unwrap();
        catalog.record_metadata(b.id, &stat, &metadata()).unwrap();

        let artifact = dir.path().join("a.md");
        let content = NewTranscription {
            transcript_text: "hello".to_string(),
            title: "Hello".to_string(),
            summary: "Hi.".to_string(),
        };
        catalog
            .commit_transcription(
                a.id,
                &content,
                &["space travel".to_string(), "NASA".to_string()],
                |_: &Video, _: &[crate::vocabulary::Keyword]| {
                    std::fs::write(&artifact, "x")?;
                    Ok::<PathBuf, crate::error::VidscribeError>(artifact.clone())
                },
            )
            .unwrap();

        let snapshot = CatalogSnapshot::capture(&catalog).unwrap();

        assert_eq!(snapshot.status_counts["transcribed"], 1);
        assert_eq!(snapshot.status_counts["ready"], 1);
        assert_eq!(snapshot.status_counts["new"], 1);
        assert_eq!(snapshot.status_counts["missing"], 0);
        assert_eq!(snapshot.videos.len(), 3);
        assert_eq!(snapshot.transcriptions.len(), 1);
        assert_eq!(snapshot.transcriptions[0].keywords, vec!["NASA", "Space Travel"]);
        assert_eq!(snapshot.top_keywords(10).len(), 2);
        assert!(snapshot.consistency_issues.is_empty());

        let out = dir.path().join("report").join("snapshot.json");
        snapshot.write_json(&out).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(json["transcriptions"][0]["title"], "Hello");
        assert_eq!(json["keywords"].as_array().unwrap().len(), 2);
    }
}
