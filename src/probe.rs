//! Video metadata extraction via ffprobe.

use crate::error::{Result, VidscribeError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Technical metadata of a video file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
    pub codec: String,
    /// Bits per second, when the container reports it.
    pub bitrate: Option<u64>,
    pub fps: Option<f64>,
}

impl VideoMetadata {
    /// `WIDTHxHEIGHT`, e.g. `1920x1080`.
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Trait for metadata extractors.
#[async_trait]
pub trait MetadataProbe: Send + Sync {
    /// Extract metadata. A file without a video stream is a [`VidscribeError::Probe`].
    async fn probe(&self, path: &Path) -> Result<VideoMetadata>;
}

/// Metadata extractor shelling out to `ffprobe`.
#[derive(Debug, Default, Clone)]
pub struct FfprobeProbe;

impl FfprobeProbe {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetadataProbe for FfprobeProbe {
    #[instrument(skip(self))]
    async fn probe(&self, path: &Path) -> Result<VideoMetadata> {
        let result = Command::new("ffprobe")
            .arg("-v").arg("quiet")
            .arg("-print_format").arg("json")
            .arg("-show_format")
            .arg("-show_streams")
            .arg(path)
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VidscribeError::ToolNotFound("ffprobe".into()));
            }
            Err(e) => {
                return Err(VidscribeError::Probe(format!("ffprobe execution failed: {e}")));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VidscribeError::Probe(format!(
                "ffprobe could not read {}: {}",
                path.display(),
                stderr.trim()
            )));
        }

        let metadata = parse_ffprobe_output(&String::from_utf8_lossy(&output.stdout))?;
        debug!(
            duration = metadata.duration_seconds,
            resolution = %metadata.resolution(),
            codec = %metadata.codec,
            "Probed video"
        );
        Ok(metadata)
    }
}

/// Parse the JSON printed by `ffprobe -show_format -show_streams`.
pub fn parse_ffprobe_output(json: &str) -> Result<VideoMetadata> {
    let parsed: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| VidscribeError::Probe(format!("Invalid ffprobe output: {e}")))?;

    let video_stream = parsed["streams"]
        .as_array()
        .and_then(|streams| {
            streams
                .iter()
                .find(|s| s["codec_type"].as_str() == Some("video"))
        })
        .ok_or_else(|| VidscribeError::Probe("no video stream found".into()))?;

    let duration_seconds = number(&parsed["format"]["duration"])
        .or_else(|| number(&video_stream["duration"]))
        .ok_or_else(|| VidscribeError::Probe("could not determine duration".into()))?;

    let bitrate = number(&parsed["format"]["bit_rate"])
        .or_else(|| number(&video_stream["bit_rate"]))
        .map(|b| b as u64);

    let fps = video_stream["avg_frame_rate"]
        .as_str()
        .and_then(parse_frame_rate)
        .or_else(|| video_stream["r_frame_rate"].as_str().and_then(parse_frame_rate));

    Ok(VideoMetadata {
        duration_seconds,
        width: video_stream["width"].as_u64().unwrap_or(0) as u32,
        height: video_stream["height"].as_u64().unwrap_or(0) as u32,
        codec: video_stream["codec_name"]
            .as_str()
            .unwrap_or("unknown")
            .to_string(),
        bitrate,
        fps,
    })
}

// ffprobe prints most numbers as strings.
fn number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Parse `30000/1001` style rates. `0/0` means unknown.
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let (num, den) = rate.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den == 0.0 || num == 0.0 {
        return None;
    }
    Some(((num / den) * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"codec_type": "audio", "codec_name": "aac"},
            {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080,
             "avg_frame_rate": "30000/1001", "r_frame_rate": "30/1"}
        ],
        "format": {"duration": "63.500000", "bit_rate": "4500000"}
    }"#;

    #[test]
    fn test_parse_full_output() {
        let meta = parse_ffprobe_output(SAMPLE).unwrap();
        assert_eq!(meta.codec, "h264");
        assert_eq!(meta.resolution(), "1920x1080");
        assert_eq!(meta.duration_seconds, 63.5);
        assert_eq!(meta.bitrate, Some(4_500_000));
        assert_eq!(meta.fps, Some(29.97));
    }

    #[test]
    fn test_audio_only_file_is_rejected() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "5"}}"#;
        let err = parse_ffprobe_output(json).unwrap_err();
        assert!(matches!(err, VidscribeError::Probe(_)));
    }

    #[test]
    fn test_unknown_frame_rate_falls_back() {
        let json = r#"{
            "streams": [{"codec_type": "video", "codec_name": "vp9", "width": 640, "height": 360,
                         "avg_frame_rate": "0/0", "r_frame_rate": "25/1", "duration": "2.0"}],
            "format": {}
        }"#;
        let meta = parse_ffprobe_output(json).unwrap();
        assert_eq!(meta.fps, Some(25.0));
        assert_eq!(meta.duration_seconds, 2.0);
        assert_eq!(meta.bitrate, None);
    }

    #[test]
    fn test_garbage_is_a_probe_error() {
        assert!(matches!(
            parse_ffprobe_output("not json").unwrap_err(),
            VidscribeError::Probe(_)
        ));
    }
}
