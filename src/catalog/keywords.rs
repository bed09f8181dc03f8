//! Vocabulary queries and casing overrides through the catalog handle.

use super::Catalog;
use crate::error::Result;
use crate::vocabulary::{self, Keyword};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// A vocabulary entry with the number of transcriptions that use it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordUsage {
    #[serde(flatten)]
    pub keyword: Keyword,
    pub usage_count: u64,
}

impl Catalog {
    /// Resolve a single candidate outside of a transcription commit.
    #[instrument(skip(self))]
    pub fn resolve_keyword(&self, candidate: &str) -> Result<Option<Keyword>> {
        let conn = self.conn()?;
        vocabulary::resolve(&conn, candidate)
    }

    /// Every keyword, most used first.
    pub fn list_keywords_with_usage(&self) -> Result<Vec<KeywordUsage>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT keyword_id, normalized, display, usage_count FROM keyword_usage
             ORDER BY usage_count DESC, display",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(KeywordUsage {
                keyword: Keyword {
                    id: row.get(0)?,
                    normalized: row.get(1)?,
                    display: row.get(2)?,
                },
                usage_count: row.get::<_, i64>(3)?.max(0) as u64,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Display forms of the whole vocabulary, for steering text generation
    /// toward existing keywords.
    pub fn keyword_displays(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT display FROM keywords ORDER BY display")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    /// Register a casing override. Returns `false` if the key already had one.
    /// Existing keywords keep their display form.
    #[instrument(skip(self))]
    pub fn add_casing_override(&self, key: &str, display_form: &str) -> Result<bool> {
        let conn = self.conn()?;
        let added = vocabulary::add_casing_override(&conn, key, display_form)?;
        if added {
            info!("Added casing override {:?} -> {:?}", key, display_form);
        }
        Ok(added)
    }

    pub fn casing_overrides(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT normalized, display FROM casing_overrides ORDER BY normalized")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_counts_start_at_zero() {
        let catalog = Catalog::in_memory().unwrap();
        catalog.resolve_keyword("Rust").unwrap();
        catalog.resolve_keyword("rust ").unwrap();

        let usage = catalog.list_keywords_with_usage().unwrap();
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].keyword.display, "Rust");
        assert_eq!(usage[0].usage_count, 0);
        assert_eq!(catalog.keyword_displays().unwrap(), vec!["Rust".to_string()]);
    }

    #[test]
    fn test_override_does_not_rewrite_existing_keyword() {
        let catalog = Catalog::in_memory().unwrap();
        catalog.resolve_keyword("ev charging").unwrap();

        assert!(catalog.add_casing_override("ev charging", "EV Charging").unwrap());
        let keyword = catalog.resolve_keyword("EV CHARGING").unwrap().unwrap();
        assert_eq!(keyword.display, "Ev Charging");

        let overrides = catalog.casing_overrides().unwrap();
        assert!(overrides.contains(&("ev charging".to_string(), "EV Charging".to_string())));
        assert!(overrides.contains(&("at&t".to_string(), "AT&T".to_string())));
    }
}
