//! Transcription rows, their keyword edges and the atomic commit.

use super::videos::{apply_event, load_video};
use super::{transcription_from_row, Catalog, Transcription, Video, TRANSCRIPTION_COLUMNS};
use crate::error::{Result, VidscribeError};
use crate::lifecycle::LifecycleEvent;
use crate::vocabulary::{self, Keyword};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Content produced for a video, ready to be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTranscription {
    pub transcript_text: String,
    pub title: String,
    pub summary: String,
}

fn load_transcription(conn: &Connection, video_id: i64) -> Result<Option<Transcription>> {
    let transcription = conn
        .query_row(
            &format!(
                "SELECT {} FROM transcriptions WHERE video_id = ?1",
                TRANSCRIPTION_COLUMNS
            ),
            params![video_id],
            transcription_from_row,
        )
        .optional()?;
    Ok(transcription)
}

fn load_keywords(conn: &Connection, transcription_id: i64) -> Result<Vec<Keyword>> {
    let mut stmt = conn.prepare(
        "SELECT k.id, k.normalized, k.display
         FROM transcription_keywords tk
         JOIN keywords k ON k.id = tk.keyword_id
         WHERE tk.transcription_id = ?1
         ORDER BY k.display",
    )?;
    let rows = stmt.query_map(params![transcription_id], |row| {
        Ok(Keyword {
            id: row.get(0)?,
            normalized: row.get(1)?,
            display: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

impl Catalog {
    /// Commit a transcription for a READY or ERROR video as one unit.
    ///
    /// Inside a single transaction: keyword candidates are resolved through
    /// the vocabulary, `write_artifact` is called with the resolved keywords
    /// and returns the artifact path, any previous transcription is replaced,
    /// the keyword edges are written and the video moves to TRANSCRIBED.
    ///
    /// If anything after the artifact write fails the transaction rolls back
    /// and the new artifact is removed. When it overwrote the previous
    /// transcription's file, the old contents are put back instead.
    #[instrument(skip(self, content, keyword_candidates, write_artifact))]
    pub fn commit_transcription<F>(
        &self,
        video_id: i64,
        content: &NewTranscription,
        keyword_candidates: &[String],
        write_artifact: F,
    ) -> Result<(Transcription, Vec<Keyword>)>
    where
        F: FnOnce(&Video, &[Keyword]) -> Result<PathBuf>,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let video = load_video(&tx, video_id)?;
        if !video.status.is_transcribable() {
            return Err(VidscribeError::InvalidTransition {
                from: video.status.to_string(),
                event: format!("{:?}", LifecycleEvent::TranscriptionSucceeded),
            });
        }

        let mut seen = HashSet::new();
        let mut keywords = Vec::new();
        for candidate in keyword_candidates {
            if let Some(keyword) = vocabulary::resolve(&tx, candidate)? {
                if seen.insert(keyword.id) {
                    keywords.push(keyword);
                }
            }
        }

        let previous_file = load_transcription(&tx, video_id)?.map(|t| t.transcript_file);
        let previous_body = match &previous_file {
            Some(path) if path.is_file() => Some(std::fs::read(path)?),
            _ => None,
        };
        let artifact = write_artifact(&video, &keywords)?;

        match persist(tx, video_id, content, &keywords, &artifact) {
            Ok(transcription) => {
                info!(
                    video_id,
                    keywords = keywords.len(),
                    "Committed transcription {:?}",
                    transcription.title
                );
                Ok((transcription, keywords))
            }
            Err(e) => {
                match previous_body.filter(|_| previous_file.as_deref() == Some(artifact.as_path())) {
                    Some(body) => restore_previous(&artifact, &body),
                    None => remove_orphan(&artifact),
                }
                Err(e)
            }
        }
    }

    pub fn get_transcription_for_video(&self, video_id: i64) -> Result<Option<Transcription>> {
        let conn = self.conn()?;
        load_transcription(&conn, video_id)
    }

    /// Keywords attached to a transcription, by display form.
    pub fn transcription_keywords(&self, transcription_id: i64) -> Result<Vec<Keyword>> {
        let conn = self.conn()?;
        load_keywords(&conn, transcription_id)
    }

    pub fn list_transcriptions(&self) -> Result<Vec<Transcription>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transcriptions ORDER BY video_id",
            TRANSCRIPTION_COLUMNS
        ))?;
        let rows = stmt.query_map([], transcription_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Rows that break the catalog's cross-table rules. Empty when healthy.
    pub fn consistency_issues(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut issues = Vec::new();

        let mut stmt = conn.prepare(
            "SELECT v.id, v.path FROM videos v
             LEFT JOIN transcriptions t ON t.video_id = v.id
             WHERE v.status = 'transcribed' AND t.id IS NULL",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (id, path) = row?;
            issues.push(format!("video {} ({}) is transcribed but has no transcription", id, path));
        }

        let mut stmt = conn.prepare(
            "SELECT v.id, v.path FROM videos v
             JOIN transcriptions t ON t.video_id = v.id
             WHERE v.status = 'new'",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (id, path) = row?;
            issues.push(format!("video {} ({}) is new but has a transcription", id, path));
        }

        let mut stmt = conn.prepare(
            "SELECT tk.transcription_id, tk.keyword_id FROM transcription_keywords tk
             LEFT JOIN keywords k ON k.id = tk.keyword_id
             LEFT JOIN transcriptions t ON t.id = tk.transcription_id
             WHERE k.id IS NULL OR t.id IS NULL",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?;
        for row in rows {
            let (transcription_id, keyword_id) = row?;
            issues.push(format!(
                "dangling keyword link {} -> {}",
                transcription_id, keyword_id
            ));
        }

        let mut stmt = conn.prepare(
            "SELECT v.id, t.transcript_file FROM videos v
             JOIN transcriptions t ON t.video_id = v.id
             WHERE v.status = 'transcribed'",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (id, file) = row?;
            if !Path::new(&file).exists() {
                issues.push(format!("video {} transcript file {} does not exist", id, file));
            }
        }

        Ok(issues)
    }
}

fn persist(
    tx: Transaction<'_>,
    video_id: i64,
    content: &NewTranscription,
    keywords: &[Keyword],
    artifact: &Path,
) -> Result<Transcription> {
    let now = Utc::now().to_rfc3339();

    // Edges go with the old row.
    tx.execute(
        "DELETE FROM transcriptions WHERE video_id = ?1",
        params![video_id],
    )?;
    tx.execute(
        "INSERT INTO transcriptions (video_id, transcript_text, title, summary, transcript_file, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            video_id,
            content.transcript_text,
            content.title,
            content.summary,
            artifact.to_string_lossy(),
            now
        ],
    )?;
    let transcription_id = tx.last_insert_rowid();

    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO transcription_keywords (transcription_id, keyword_id) VALUES (?1, ?2)",
        )?;
        for keyword in keywords {
            stmt.execute(params![transcription_id, keyword.id])?;
        }
    }

    tx.execute(
        "UPDATE videos SET error_message = NULL WHERE id = ?1",
        params![video_id],
    )?;
    apply_event(&tx, video_id, LifecycleEvent::TranscriptionSucceeded)?;

    let transcription = load_transcription(&tx, video_id)?.ok_or_else(|| {
        VidscribeError::Catalog(format!("transcription for video {} vanished", video_id))
    })?;
    tx.commit()?;
    Ok(transcription)
}

fn remove_orphan(artifact: &Path) {
    if let Err(e) = std::fs::remove_file(artifact) {
        warn!("Failed to remove orphaned artifact {:?}: {}", artifact, e);
    }
}

fn restore_previous(artifact: &Path, body: &[u8]) {
    if let Err(e) = std::fs::write(artifact, body) {
        warn!("Failed to restore previous artifact {:?}: {}", artifact, e);
    }
}
