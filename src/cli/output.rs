//! CLI output formatting utilities.

use crate::artifact::format_duration;
use crate::catalog::Video;
use crate::lifecycle::VideoStatus;
use console::{style, StyledObject};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print one catalogued video.
    pub fn video_info(video: &Video) {
        let details = match &video.metadata {
            Some(meta) => format!(
                "{}, {}",
                format_duration(meta.duration_seconds),
                meta.resolution()
            ),
            None => "no metadata".to_string(),
        };

        println!(
            "  {} {:>4} {} {} ({})",
            style("*").cyan(),
            style(video.id).dim(),
            status_label(video.status),
            style(&video.filename).bold(),
            style(details).dim()
        );
        if let Some(message) = &video.error_message {
            println!("         {}", style(message).red().dim());
        }
    }
}

fn status_label(status: VideoStatus) -> StyledObject<String> {
    let label = format!("{:<11}", status.as_str());
    match status {
        VideoStatus::New => style(label).dim(),
        VideoStatus::Ready => style(label).cyan(),
        VideoStatus::Transcribed => style(label).green(),
        VideoStatus::Missing => style(label).yellow(),
        VideoStatus::Error => style(label).red(),
    }
}
