//! Durable catalog of videos, transcriptions and the keyword vocabulary.
//!
//! A single SQLite database behind a mutex. Every multi-row mutation runs in
//! one transaction so a crash never leaves a half-written transcription.

mod keywords;
mod locks;
pub mod schema;
mod transcriptions;
mod videos;

pub use keywords::KeywordUsage;
pub use locks::{LockRegistry, VideoLock};
pub use transcriptions::NewTranscription;

use crate::error::{Result, VidscribeError};
use crate::lifecycle::VideoStatus;
use crate::probe::VideoMetadata;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{info, instrument};

/// A catalogued video file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: i64,
    pub path: PathBuf,
    pub filename: String,
    pub size_bytes: u64,
    /// Modification time in unix milliseconds.
    pub modified_at: i64,
    /// Present once metadata extraction has succeeded.
    pub metadata: Option<VideoMetadata>,
    pub status: VideoStatus,
    pub error_message: Option<String>,
    pub last_seen_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A committed transcription with its generated title and summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub id: i64,
    pub video_id: i64,
    pub transcript_text: String,
    pub title: String,
    pub summary: String,
    pub transcript_file: PathBuf,
    pub created_at: String,
}

/// The catalog store.
pub struct Catalog {
    conn: Mutex<Connection>,
    locks: LockRegistry,
}

impl Catalog {
    /// Open (or create) the catalog at `path` and bring its schema up to date.
    #[instrument(skip_all)]
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;",
        )?;
        let version = schema::ensure_schema(&mut conn)?;

        info!("Opened catalog at {:?} (schema v{})", path, version);

        Ok(Self {
            conn: Mutex::new(conn),
            locks: LockRegistry::default(),
        })
    }

    /// Create an in-memory catalog (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        schema::ensure_schema(&mut conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            locks: LockRegistry::default(),
        })
    }

    /// Schema version currently recorded in the store.
    pub fn schema_version(&self) -> Result<u32> {
        let conn = self.conn()?;
        schema::schema_version(&conn)
    }

    /// Take the processing lock for a video. Fails with
    /// [`VidscribeError::LockContention`] if another worker holds it.
    pub fn try_lock_video(&self, video_id: i64) -> Result<VideoLock> {
        self.locks.try_lock(video_id)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| VidscribeError::Catalog(format!("Failed to acquire lock: {}", e)))
    }
}

const VIDEO_COLUMNS: &str = "id, path, filename, size_bytes, modified_at, duration_seconds, \
     width, height, codec, bitrate, fps, status, error_message, last_seen_at, created_at, updated_at";

fn video_from_row(row: &Row<'_>) -> rusqlite::Result<Video> {
    let path: String = row.get(1)?;
    let duration_seconds: Option<f64> = row.get(5)?;
    let status: String = row.get(11)?;

    let metadata = match duration_seconds {
        Some(duration_seconds) => Some(VideoMetadata {
            duration_seconds,
            width: row.get::<_, Option<u32>>(6)?.unwrap_or(0),
            height: row.get::<_, Option<u32>>(7)?.unwrap_or(0),
            codec: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
            bitrate: row.get::<_, Option<i64>>(9)?.map(|b| b.max(0) as u64),
            fps: row.get(10)?,
        }),
        None => None,
    };

    Ok(Video {
        id: row.get(0)?,
        path: PathBuf::from(path),
        filename: row.get(2)?,
        size_bytes: row.get::<_, i64>(3)?.max(0) as u64,
        modified_at: row.get(4)?,
        metadata,
        status: status
            .parse()
            .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(11, Type::Text, e.into()))?,
        error_message: row.get(12)?,
        last_seen_at: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

const TRANSCRIPTION_COLUMNS: &str =
    "id, video_id, transcript_text, title, summary, transcript_file, created_at";

fn transcription_from_row(row: &Row<'_>) -> rusqlite::Result<Transcription> {
    let transcript_file: String = row.get(5)?;
    Ok(Transcription {
        id: row.get(0)?,
        video_id: row.get(1)?,
        transcript_text: row.get(2)?,
        title: row.get(3)?,
        summary: row.get(4)?,
        transcript_file: PathBuf::from(transcript_file),
        created_at: row.get(6)?,
    })
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
