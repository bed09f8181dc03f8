//! Controlled keyword vocabulary.
//!
//! Every keyword candidate coming out of text generation is funneled through
//! [`resolve`], which deduplicates by a normalized comparison key and decides
//! the display casing exactly once, when the keyword is first inserted.

use crate::error::{Result, VidscribeError};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Connector words kept lowercase unless they open the keyword.
const LOWERCASE_CONNECTORS: &[&str] = &[
    "a", "an", "and", "at", "by", "for", "in", "of", "on", "or", "the", "to",
];

/// A keyword in the shared vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    pub id: i64,
    /// Comparison key: case-folded, trimmed, single-spaced.
    pub normalized: String,
    /// Established display form.
    pub display: String,
}

/// Collapse whitespace and trim, keeping the original casing.
fn collapse_whitespace(candidate: &str) -> String {
    candidate.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Comparison key for a candidate, or `None` when nothing usable is left.
pub fn normalize(candidate: &str) -> Option<String> {
    let collapsed = collapse_whitespace(candidate);
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.to_lowercase())
    }
}

/// Resolve a candidate to its vocabulary entry, inserting it if needed.
///
/// Returns `Ok(None)` for empty or whitespace-only candidates. Runs against
/// whatever connection or transaction it is handed, so a caller committing a
/// transcription can resolve its keywords inside the same unit of work.
pub fn resolve(conn: &Connection, candidate: &str) -> Result<Option<Keyword>> {
    let Some(normalized) = normalize(candidate) else {
        debug!("Discarding unusable keyword candidate {:?}", candidate);
        return Ok(None);
    };

    if let Some(existing) = find(conn, &normalized)? {
        return Ok(Some(existing));
    }

    let display = match casing_override(conn, &normalized)? {
        Some(display) => display,
        None => default_display_form(&collapse_whitespace(candidate), |word| {
            casing_override(conn, word)
        })?,
    };

    insert_or_get(conn, &normalized, &display).map(Some)
}

/// Insert a keyword, or return the row already stored under `normalized`.
///
/// A key collision is not an error: the existing row and its display form
/// win, and `display` is dropped.
pub fn insert_or_get(conn: &Connection, normalized: &str, display: &str) -> Result<Keyword> {
    let inserted = conn.execute(
        "INSERT INTO keywords (normalized, display, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(normalized) DO NOTHING",
        params![normalized, display, Utc::now().to_rfc3339()],
    )?;
    if inserted == 0 {
        debug!("Keyword {:?} already exists, reusing it", normalized);
    }

    find(conn, normalized)?.ok_or_else(|| {
        VidscribeError::Catalog(format!("keyword {:?} vanished after insert", normalized))
    })
}

/// Look up an existing keyword by comparison key.
pub fn find(conn: &Connection, normalized: &str) -> Result<Option<Keyword>> {
    let keyword = conn
        .query_row(
            "SELECT id, normalized, display FROM keywords WHERE normalized = ?1",
            params![normalized],
            |row| {
                Ok(Keyword {
                    id: row.get(0)?,
                    normalized: row.get(1)?,
                    display: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(keyword)
}

/// Preserved display spelling for a comparison key, if one is registered.
pub fn casing_override(conn: &Connection, normalized: &str) -> Result<Option<String>> {
    let display = conn
        .query_row(
            "SELECT display FROM casing_overrides WHERE normalized = ?1",
            params![normalized],
            |row| row.get(0),
        )
        .optional()?;
    Ok(display)
}

/// Register a casing override. Overrides are append-only: returns `false`
/// when the key already has one and leaves it untouched.
pub fn add_casing_override(conn: &Connection, key: &str, display: &str) -> Result<bool> {
    let display = collapse_whitespace(display);
    let Some(normalized) = normalize(key) else {
        return Ok(false);
    };
    if display.is_empty() {
        return Ok(false);
    }

    let inserted = conn.execute(
        "INSERT OR IGNORE INTO casing_overrides (normalized, display, created_at) VALUES (?1, ?2, ?3)",
        params![normalized, display, Utc::now().to_rfc3339()],
    )?;
    Ok(inserted > 0)
}

/// Title-case a keyword for display.
///
/// Words that are already all-uppercase are kept as acronyms, connector words
/// stay lowercase after the first word, and `override_for` is consulted for
/// each word and each hyphen/ampersand part (`"ibm cloud"` -> `"IBM Cloud"`).
pub fn default_display_form<F>(candidate: &str, override_for: F) -> Result<String>
where
    F: Fn(&str) -> Result<Option<String>>,
{
    let words = candidate
        .split_whitespace()
        .enumerate()
        .map(|(i, word)| -> Result<String> {
            let lower = word.to_lowercase();
            Ok(if let Some(display) = override_for(&lower)? {
                display
            } else if is_acronym(word) {
                word.to_string()
            } else if i > 0 && LOWERCASE_CONNECTORS.contains(&lower.as_str()) {
                lower
            } else {
                capitalize_parts(word, &override_for)?
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(words.join(" "))
}

fn is_acronym(word: &str) -> bool {
    word.chars().any(|c| c.is_alphabetic()) && !word.chars().any(|c| c.is_lowercase())
}

/// Capitalize every part of a word split on `-` and `&`, keeping the separators.
fn capitalize_parts<F>(word: &str, override_for: &F) -> Result<String>
where
    F: Fn(&str) -> Result<Option<String>>,
{
    let mut out = String::with_capacity(word.len());
    let mut part = String::new();

    for c in word.chars() {
        if c == '-' || c == '&' {
            out.push_str(&capitalize_part(&part, override_for)?);
            out.push(c);
            part.clear();
        } else {
            part.push(c);
        }
    }
    out.push_str(&capitalize_part(&part, override_for)?);
    Ok(out)
}

fn capitalize_part<F>(part: &str, override_for: &F) -> Result<String>
where
    F: Fn(&str) -> Result<Option<String>>,
{
    if part.is_empty() {
        return Ok(String::new());
    }
    if let Some(display) = override_for(&part.to_lowercase())? {
        return Ok(display);
    }
    if is_acronym(part) {
        return Ok(part.to_string());
    }

    let mut chars = part.chars();
    Ok(match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    })
}
