//! Markdown transcript files, one per transcription.

use crate::catalog::Video;
use crate::error::Result;
use crate::generation::GeneratedContent;
use crate::vocabulary::Keyword;
use chrono::{DateTime, Local};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Deterministic artifact name: `<stem>-<8 hex chars of sha256(path)>.md`.
///
/// The hash keeps two `intro.mp4` files in different folders apart.
pub fn artifact_file_name(video_path: &Path) -> String {
    let stem = video_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());

    let digest = Sha256::digest(video_path.to_string_lossy().as_bytes());
    let suffix: String = digest[..4].iter().map(|b| format!("{:02x}", b)).collect();

    format!("{}-{}.md", stem, suffix)
}

/// Render the markdown body for a transcription.
pub fn render_markdown(
    video: &Video,
    content: &GeneratedContent,
    keywords: &[Keyword],
    transcript: &str,
    transcribed_at: DateTime<Local>,
) -> String {
    let mut md = String::new();

    let _ = writeln!(md, "# {}\n", content.title);

    md.push_str("## File Information\n\n");
    let _ = writeln!(md, "- **Filename:** {}", video.filename);
    if let Some(meta) = &video.metadata {
        let _ = writeln!(md, "- **Duration:** {}", format_duration(meta.duration_seconds));
        let _ = writeln!(md, "- **Resolution:** {}", meta.resolution());
    }
    let _ = writeln!(md, "- **Size:** {}", format_size(video.size_bytes));
    if let Some(meta) = &video.metadata {
        let _ = writeln!(md, "- **Codec:** {}", meta.codec);
    }
    let _ = writeln!(
        md,
        "- **Transcribed:** {}\n",
        transcribed_at.format("%Y-%m-%d %H:%M:%S")
    );

    md.push_str("## Summary\n\n");
    let _ = writeln!(md, "{}\n", content.summary);

    md.push_str("## Keywords\n\n");
    if keywords.is_empty() {
        md.push_str("No keywords available\n\n");
    } else {
        let names: Vec<&str> = keywords.iter().map(|k| k.display.as_str()).collect();
        let _ = writeln!(md, "{}\n", names.join(", "));
    }

    md.push_str("## Transcript\n\n");
    let _ = writeln!(md, "{}", transcript);

    md
}

/// Write `body` to `dir/file_name` through a temporary file in the same
/// directory, so the target is either the old file or the complete new one.
pub fn write_artifact(dir: &Path, file_name: &str, body: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let target = dir.join(file_name);

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(body.as_bytes())?;
    tmp.flush()?;
    tmp.persist(&target).map_err(|e| e.error)?;

    debug!("Wrote transcript artifact {:?}", target);
    Ok(target)
}

/// `H:MM:SS`, or `M:SS` under an hour.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Human-readable size with binary units.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < MB {
        format!("{:.1} KB", b / KB)
    } else if b < GB {
        format!("{:.1} MB", b / MB)
    } else {
        format!("{:.2} GB", b / GB)
    }
}
