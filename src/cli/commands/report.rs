//! Report command implementation.

use crate::catalog::Catalog;
use crate::cli::Output;
use crate::config::Settings;
use crate::report::CatalogSnapshot;
use anyhow::Result;

/// Print catalog statistics, optionally writing the full snapshot as JSON.
pub fn run_report(output: Option<&str>, top: usize, settings: &Settings) -> Result<()> {
    let catalog = Catalog::open(&settings.database_path())?;
    let snapshot = CatalogSnapshot::capture(&catalog)?;

    Output::header("Videos by status");
    for (status, count) in &snapshot.status_counts {
        Output::kv(status, &count.to_string());
    }
    Output::kv("Transcriptions", &snapshot.transcriptions.len().to_string());

    let top_keywords = snapshot.top_keywords(top);
    if !top_keywords.is_empty() {
        Output::header("Top keywords");
        for entry in top_keywords {
            Output::list_item(&format!(
                "{} ({})",
                entry.keyword.display, entry.usage_count
            ));
        }
    }

    if !snapshot.consistency_issues.is_empty() {
        Output::header("Consistency issues");
        for issue in &snapshot.consistency_issues {
            Output::warning(issue);
        }
    }

    if let Some(path) = output {
        let path = Settings::expand_path(path);
        snapshot.write_json(&path)?;
        println!();
        Output::success(&format!("Snapshot written to {}", path.display()));
    }

    Ok(())
}
