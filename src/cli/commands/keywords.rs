//! Keywords command implementation.

use crate::catalog::Catalog;
use crate::cli::{KeywordsAction, Output};
use crate::config::Settings;
use anyhow::Result;
use console::style;

/// Run the keywords command.
pub fn run_keywords(action: &KeywordsAction, settings: &Settings) -> Result<()> {
    let catalog = Catalog::open(&settings.database_path())?;

    match action {
        KeywordsAction::List => {
            let keywords = catalog.list_keywords_with_usage()?;
            if keywords.is_empty() {
                Output::info("The vocabulary is empty.");
                return Ok(());
            }

            Output::header(&format!("Keywords ({})", keywords.len()));
            println!();
            for entry in &keywords {
                println!(
                    "  {:>5}  {} {}",
                    entry.usage_count,
                    style(&entry.keyword.display).bold(),
                    style(format!("({})", entry.keyword.normalized)).dim()
                );
            }
        }

        KeywordsAction::Add { candidate } => match catalog.resolve_keyword(candidate)? {
            Some(keyword) => Output::success(&format!(
                "'{}' is keyword {} ({})",
                candidate,
                style(&keyword.display).bold(),
                keyword.normalized
            )),
            None => Output::warning(&format!("'{}' is not a usable keyword", candidate)),
        },

        KeywordsAction::Override { key, display } => {
            if catalog.add_casing_override(key, display)? {
                Output::success(&format!("'{}' will be displayed as '{}'", key, display));
                Output::info("Existing keywords keep their display form.");
            } else {
                Output::warning(&format!(
                    "An override for '{}' already exists; overrides are append-only.",
                    key
                ));
            }
        }

        KeywordsAction::Overrides => {
            let overrides = catalog.casing_overrides()?;
            Output::header(&format!("Casing overrides ({})", overrides.len()));
            println!();
            for (key, display) in &overrides {
                Output::kv(key, display);
            }
        }
    }

    Ok(())
}
