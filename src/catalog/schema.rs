//! Table definitions and the versioned migration ledger.
//!
//! Every migration is idempotent on its own (it checks for the table or column
//! before touching it) and the whole sequence runs in one transaction, so a
//! failing step leaves the store exactly as it was before `ensure_schema`.

use crate::error::{Result, VidscribeError};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::{debug, info};

/// Latest schema version this binary knows how to produce.
pub const SCHEMA_VERSION: u32 = 5;

struct Migration {
    version: u32,
    description: &'static str,
    apply: fn(&Transaction<'_>) -> rusqlite::Result<()>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "videos, transcriptions and keyword tables",
        apply: create_base_tables,
    },
    Migration {
        version: 2,
        description: "lifecycle columns on videos",
        apply: add_lifecycle_columns,
    },
    Migration {
        version: 3,
        description: "summary column on transcriptions",
        apply: add_summary_column,
    },
    Migration {
        version: 4,
        description: "casing overrides",
        apply: create_casing_overrides,
    },
    Migration {
        version: 5,
        description: "indexes and reporting views",
        apply: create_reporting_views,
    },
];

/// Known special-entity spellings seeded into `casing_overrides`.
const SEED_CASING_OVERRIDES: &[(&str, &str)] = &[
    ("at&t", "AT&T"),
    ("t-mobile", "T-Mobile"),
    ("pse&g", "PSE&G"),
    ("verizon", "Verizon"),
    ("aol", "AOL"),
    ("ibm", "IBM"),
    ("hp", "HP"),
    ("fcc", "FCC"),
    ("nasa", "NASA"),
    ("cnn", "CNN"),
    ("bbc", "BBC"),
    ("nbc", "NBC"),
    ("abc", "ABC"),
    ("cbs", "CBS"),
    ("espn", "ESPN"),
    ("fbi", "FBI"),
    ("cia", "CIA"),
    ("dea", "DEA"),
    ("atm", "ATM"),
    ("html", "HTML"),
    ("css", "CSS"),
    ("php", "PHP"),
    ("usa", "USA"),
    ("uk", "UK"),
    ("un", "UN"),
    ("eu", "EU"),
    ("msnbc", "MSNBC"),
    ("tv", "TV"),
    ("gps", "GPS"),
    ("hbo", "HBO"),
    ("wifi", "WiFi"),
    ("vpn", "VPN"),
    ("sms", "SMS"),
    ("mms", "MMS"),
];

/// Create missing tables and apply every pending migration.
///
/// Returns the schema version the store is at afterwards. Any failure is a
/// [`VidscribeError::Schema`] and nothing is committed.
pub fn ensure_schema(conn: &mut Connection) -> Result<u32> {
    let tx = conn.transaction().map_err(schema_error)?;

    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        );
        "#,
    )
    .map_err(schema_error)?;

    let current = read_version(&tx).map_err(schema_error)?;

    if current > SCHEMA_VERSION {
        return Err(VidscribeError::Schema(format!(
            "catalog schema version {} is newer than supported version {}; upgrade vidscribe to open it",
            current, SCHEMA_VERSION
        )));
    }

    if current == SCHEMA_VERSION {
        debug!("Catalog schema is up to date (v{})", current);
        return Ok(current);
    }

    info!(
        current_version = current,
        target_version = SCHEMA_VERSION,
        "Running schema migrations"
    );

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        info!(version = migration.version, "Migrating schema: {}", migration.description);

        (migration.apply)(&tx).map_err(|e| {
            VidscribeError::Schema(format!(
                "migration to v{} ({}) failed: {}",
                migration.version, migration.description, e
            ))
        })?;

        tx.execute(
            "INSERT INTO schema_version (version, description, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.description, Utc::now().to_rfc3339()],
        )
        .map_err(schema_error)?;
    }

    tx.commit().map_err(schema_error)?;
    info!("Catalog schema migrated to v{}", SCHEMA_VERSION);

    Ok(SCHEMA_VERSION)
}

/// Current schema version, 0 for a store that was never migrated.
pub fn schema_version(conn: &Connection) -> Result<u32> {
    let exists: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    if exists.is_none() {
        return Ok(0);
    }

    Ok(read_version(conn)?)
}

fn read_version(conn: &Connection) -> rusqlite::Result<u32> {
    let version: Option<u32> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(version.unwrap_or(0))
}

fn schema_error(e: rusqlite::Error) -> VidscribeError {
    VidscribeError::Schema(e.to_string())
}

fn table_exists(tx: &Transaction<'_>, table: &str) -> rusqlite::Result<bool> {
    let count: i64 = tx.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn column_exists(tx: &Transaction<'_>, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = tx.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn ensure_column(
    tx: &Transaction<'_>,
    table: &str,
    column: &str,
    declaration: &str,
) -> rusqlite::Result<()> {
    if column_exists(tx, table, column)? {
        debug!("Column {}.{} already present", table, column);
        return Ok(());
    }
    info!("Adding column {}.{}", table, column);
    tx.execute_batch(&format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        table, column, declaration
    ))
}

fn create_base_tables(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS videos (
            id INTEGER PRIMARY KEY,
            path TEXT NOT NULL UNIQUE,
            filename TEXT NOT NULL,
            size_bytes INTEGER NOT NULL DEFAULT 0,
            modified_at INTEGER NOT NULL DEFAULT 0,
            duration_seconds REAL,
            width INTEGER,
            height INTEGER,
            resolution TEXT,
            codec TEXT,
            bitrate INTEGER,
            fps REAL,
            status TEXT NOT NULL DEFAULT 'new',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS transcriptions (
            id INTEGER PRIMARY KEY,
            video_id INTEGER NOT NULL UNIQUE REFERENCES videos(id),
            transcript_text TEXT NOT NULL,
            title TEXT NOT NULL,
            transcript_file TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS keywords (
            id INTEGER PRIMARY KEY,
            normalized TEXT NOT NULL UNIQUE,
            display TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS transcription_keywords (
            transcription_id INTEGER NOT NULL REFERENCES transcriptions(id) ON DELETE CASCADE,
            keyword_id INTEGER NOT NULL REFERENCES keywords(id),
            PRIMARY KEY (transcription_id, keyword_id)
        );
        "#,
    )
}

fn add_lifecycle_columns(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    ensure_column(tx, "videos", "error_message", "TEXT")?;
    ensure_column(tx, "videos", "last_seen_at", "TEXT")
}

fn add_summary_column(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    ensure_column(tx, "transcriptions", "summary", "TEXT NOT NULL DEFAULT ''")
}

fn create_casing_overrides(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    if !table_exists(tx, "casing_overrides")? {
        tx.execute_batch(
            r#"
            CREATE TABLE casing_overrides (
                normalized TEXT PRIMARY KEY,
                display TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )?;
    }

    let now = Utc::now().to_rfc3339();
    let mut stmt = tx.prepare(
        "INSERT OR IGNORE INTO casing_overrides (normalized, display, created_at) VALUES (?1, ?2, ?3)",
    )?;
    for (normalized, display) in SEED_CASING_OVERRIDES {
        stmt.execute(params![normalized, display, now])?;
    }
    Ok(())
}

fn create_reporting_views(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute_batch(
        r#"
        CREATE INDEX IF NOT EXISTS idx_videos_status ON videos(status);
        CREATE INDEX IF NOT EXISTS idx_transcription_keywords_keyword
            ON transcription_keywords(keyword_id);

        CREATE VIEW IF NOT EXISTS keyword_usage AS
            SELECT k.id AS keyword_id,
                   k.normalized,
                   k.display,
                   COUNT(tk.transcription_id) AS usage_count
            FROM keywords k
            LEFT JOIN transcription_keywords tk ON tk.keyword_id = k.id
            GROUP BY k.id;

        CREATE VIEW IF NOT EXISTS video_catalog AS
            SELECT v.id AS video_id,
                   v.path,
                   v.filename,
                   v.status,
                   v.error_message,
                   v.size_bytes,
                   v.duration_seconds,
                   v.resolution,
                   v.codec,
                   v.bitrate,
                   v.fps,
                   v.last_seen_at,
                   t.id AS transcription_id,
                   t.title,
                   t.summary,
                   t.transcript_file,
                   t.created_at AS transcribed_at,
                   (SELECT group_concat(k.display, ', ')
                      FROM transcription_keywords tk
                      JOIN keywords k ON k.id = tk.keyword_id
                     WHERE tk.transcription_id = t.id) AS keywords
            FROM videos v
            LEFT JOIN transcriptions t ON t.video_id = v.id;
        "#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_names(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table)).unwrap();
        stmt.query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn test_fresh_store_reaches_latest_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);

        assert_eq!(ensure_schema(&mut conn).unwrap(), SCHEMA_VERSION);
        assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);

        let videos = column_names(&conn, "videos");
        assert!(videos.contains(&"error_message".to_string()));
        assert!(videos.contains(&"last_seen_at".to_string()));
        assert!(column_names(&conn, "transcriptions").contains(&"summary".to_string()));
    }

    #[test]
    fn test_ensure_schema_twice_is_noop() {
        let mut conn = Connection::open_in_memory().unwrap();
        ensure_schema(&mut conn).unwrap();

        let ledger_rows = |conn: &Connection| -> i64 {
            conn.query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
                .unwrap()
        };
        let overrides = |conn: &Connection| -> i64 {
            conn.query_row("SELECT COUNT(*) FROM casing_overrides", [], |r| r.get(0))
                .unwrap()
        };
        let before = (ledger_rows(&conn), overrides(&conn));

        assert_eq!(ensure_schema(&mut conn).unwrap(), SCHEMA_VERSION);
        assert_eq!(ensure_schema(&mut conn).unwrap(), SCHEMA_VERSION);

        assert_eq!((ledger_rows(&conn), overrides(&conn)), before);
        assert_eq!(before.0, SCHEMA_VERSION as i64);
    }

    #[test]
    fn test_migration_preserves_rows_from_v1_store() {
        let mut conn = Connection::open_in_memory().unwrap();
        {
            let tx = conn.transaction().unwrap();
            tx.execute_batch(
                "CREATE TABLE schema_version (version INTEGER PRIMARY KEY, description TEXT NOT NULL, applied_at TEXT NOT NULL);",
            )
            .unwrap();
            create_base_tables(&tx).unwrap();
            tx.execute(
                "INSERT INTO schema_version VALUES (1, 'base', '2024-01-01T00:00:00Z')",
                [],
            )
            .unwrap();
            tx.execute(
                "INSERT INTO videos (path, filename, status, created_at, updated_at)
                 VALUES ('/videos/old.mp4', 'old.mp4', 'transcribed', 'x', 'x')",
                [],
            )
            .unwrap();
            tx.execute(
                "INSERT INTO transcriptions (video_id, transcript_text, title, transcript_file, created_at)
                 VALUES (1, 'hello', 'Old', '/md/old.md', 'x')",
                [],
            )
            .unwrap();
            tx.commit().unwrap();
        }

        assert_eq!(ensure_schema(&mut conn).unwrap(), SCHEMA_VERSION);

        let (path, status): (String, String) = conn
            .query_row("SELECT path, status FROM videos WHERE id = 1", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(path, "/videos/old.mp4");
        assert_eq!(status, "transcribed");

        let summary: String = conn
            .query_row("SELECT summary FROM transcriptions WHERE video_id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(summary, "");

        let title: String = conn
            .query_row("SELECT title FROM video_catalog WHERE video_id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(title, "Old");
    }

    #[test]
    fn test_newer_store_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        ensure_schema(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO schema_version VALUES (99, 'future', '2030-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        let err = ensure_schema(&mut conn).unwrap_err();
        assert!(matches!(err, VidscribeError::Schema(_)));
    }

    #[test]
    fn test_failed_step_aborts_whole_sequence() {
        let mut conn = Connection::open_in_memory().unwrap();
        // Incompatible pre-existing table makes the casing override seed fail.
        conn.execute_batch("CREATE TABLE casing_overrides (legacy INTEGER);")
            .unwrap();

        let err = ensure_schema(&mut conn).unwrap_err();
        assert!(matches!(err, VidscribeError::Schema(_)));

        assert_eq!(schema_version(&conn).unwrap(), 0);
        let videos: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'videos'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(videos, 0);
    }
}
