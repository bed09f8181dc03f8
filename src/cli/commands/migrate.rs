//! Migrate command implementation.

use crate::catalog::{schema::SCHEMA_VERSION, Catalog};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Open the catalog, which applies any pending migrations, and report the version.
pub fn run_migrate(settings: &Settings) -> Result<()> {
    let path = settings.database_path();
    let catalog = Catalog::open(&path)?;

    Output::success(&format!(
        "Catalog at {} is at schema version {} (latest {})",
        path.display(),
        catalog.schema_version()?,
        SCHEMA_VERSION
    ));
    Ok(())
}
