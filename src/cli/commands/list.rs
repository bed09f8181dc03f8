//! List command implementation.

use crate::catalog::Catalog;
use crate::cli::Output;
use crate::config::Settings;
use crate::lifecycle::VideoStatus;
use anyhow::{anyhow, Result};

/// Run the list command.
pub fn run_list(status: Option<&str>, settings: &Settings) -> Result<()> {
    let status = status
        .map(|s| s.parse::<VideoStatus>().map_err(|e| anyhow!(e)))
        .transpose()?;

    let catalog = Catalog::open(&settings.database_path())?;
    let videos = catalog.list_videos(status)?;

    if videos.is_empty() {
        match status {
            Some(status) => Output::info(&format!("No videos with status '{}'.", status)),
            None => Output::info("No videos catalogued yet. Use 'vidscribe run' to scan your library."),
        }
        return Ok(());
    }

    Output::header(&format!("Videos ({})", videos.len()));
    println!();
    for video in &videos {
        Output::video_info(video);
    }

    if status.is_none() {
        println!();
        for status in VideoStatus::ALL {
            let count = videos.iter().filter(|v| v.status == status).count();
            if count > 0 {
                Output::kv(status.as_str(), &count.to_string());
            }
        }
    }

    Ok(())
}
