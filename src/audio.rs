//! Audio extraction and segmentation with ffmpeg.
//!
//! The transcription API takes audio, not video, and caps upload size, so each
//! video's soundtrack is pulled out as a small mono MP3 and cut into segments
//! when it is long.

use crate::error::{Result, VidscribeError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Extracts the soundtrack of a video as 16 kHz mono MP3 into `output_dir`.
#[instrument(skip(output_dir))]
pub async fn extract_audio(video: &Path, output_dir: &Path, stem: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let target = output_dir.join(format!("{}.mp3", stem));

    info!("Extracting audio from {:?}", video);

    let result = Command::new("ffmpeg")
        .arg("-i").arg(video)
        .arg("-vn")
        .arg("-ac").arg("1")
        .arg("-ar").arg("16000")
        .arg("-codec:a").arg("libmp3lame")
        .arg("-b:a").arg("64k")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(&target)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() && target.exists() => Ok(target),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(VidscribeError::ToolFailed(format!(
                "ffmpeg audio extraction failed: {}",
                err.trim()
            )))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(VidscribeError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(VidscribeError::ToolFailed(format!("ffmpeg error: {e}"))),
    }
}

/// Cuts an audio file into consecutive segments of at most `chunk_seconds`.
///
/// Returns `(segment_path, offset_seconds)` in playback order. Audio no longer
/// than one chunk is returned as-is.
#[instrument(skip_all)]
pub async fn split_audio(
    source: &Path,
    output_dir: &Path,
    chunk_seconds: u32,
) -> Result<Vec<(PathBuf, f64)>> {
    std::fs::create_dir_all(output_dir)?;

    let total_duration = probe_duration(source).await?;
    let chunk_len = chunk_seconds.max(1) as f64;

    if total_duration <= chunk_len {
        return Ok(vec![(source.to_path_buf(), 0.0)]);
    }

    let base_name = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");

    let mut segments = Vec::new();
    let mut offset = 0.0;
    let mut idx = 0u32;

    while offset < total_duration {
        let segment_path = output_dir.join(format!("{}_{:04}.mp3", base_name, idx));
        let segment_len = chunk_len.min(total_duration - offset);

        extract_segment(source, &segment_path, offset, segment_len).await?;

        debug!("Created segment {} at offset {:.1}s", idx, offset);
        segments.push((segment_path, offset));

        offset += chunk_len;
        idx += 1;
    }

    info!(
        "Split {:.1}s of audio into {} segments",
        total_duration,
        segments.len()
    );
    Ok(segments)
}

async fn extract_segment(source: &Path, dest: &Path, start: f64, length: f64) -> Result<()> {
    let copy_result = Command::new("ffmpeg")
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-c").arg("copy")
        .arg("-y")
        .arg("-loglevel").arg("warning")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    if let Ok(status) = copy_result {
        if status.success() && dest.exists() {
            return Ok(());
        }
    }

    warn!("Stream copy failed, re-encoding segment");

    let encode_result = Command::new("ffmpeg")
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-ac").arg("1")
        .arg("-ar").arg("16000")
        .arg("-codec:a").arg("libmp3lame")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match encode_result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(VidscribeError::ToolFailed(format!(
                "segment extraction failed: {}",
                err.trim()
            )))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(VidscribeError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(VidscribeError::ToolFailed(format!("ffmpeg error: {e}"))),
    }
}

/// Duration of a media file in seconds, from `ffprobe -show_format`.
pub async fn probe_duration(path: &Path) -> Result<f64> {
    let result = Command::new("ffprobe")
        .arg("-v").arg("quiet")
        .arg("-print_format").arg("json")
        .arg("-show_format")
        .arg(path)
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(VidscribeError::ToolNotFound("ffprobe".into()));
        }
        Err(e) => {
            return Err(VidscribeError::ToolFailed(format!("ffprobe failed: {e}")));
        }
    };

    if !output.status.success() {
        return Err(VidscribeError::ToolFailed("ffprobe returned error".into()));
    }

    parse_format_duration(&String::from_utf8_lossy(&output.stdout))
}

fn parse_format_duration(json: &str) -> Result<f64> {
    let parsed: serde_json::Value = serde_json::from_str(json)
        .map_err(|_| VidscribeError::ToolFailed("Invalid ffprobe output".into()))?;

    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| VidscribeError::ToolFailed("Could not determine audio duration".into()))
}
