//! Video status and the transition table that governs it.

use crate::error::{Result, VidscribeError};
use serde::{Deserialize, Serialize};

/// Status of a catalogued video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    /// Discovered, metadata not yet extracted.
    New,
    /// Metadata extracted, awaiting transcription.
    Ready,
    /// Transcription committed.
    Transcribed,
    /// File no longer found at its recorded path.
    Missing,
    /// Metadata extraction or transcription failed.
    Error,
}

/// Something that happened to a video, reported by a scan or a processing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Metadata was (re-)extracted from a new, changed or reappeared file.
    MetadataExtracted,
    /// Metadata extraction failed.
    MetadataFailed,
    /// A scan did not find the file.
    Vanished,
    /// The orchestrator committed a transcription.
    TranscriptionSucceeded,
    /// The orchestrator failed to transcribe.
    TranscriptionFailed,
}

impl VideoStatus {
    pub const ALL: [VideoStatus; 5] = [
        VideoStatus::New,
        VideoStatus::Ready,
        VideoStatus::Transcribed,
        VideoStatus::Missing,
        VideoStatus::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::New => "new",
            VideoStatus::Ready => "ready",
            VideoStatus::Transcribed => "transcribed",
            VideoStatus::Missing => "missing",
            VideoStatus::Error => "error",
        }
    }

    /// Whether the orchestrator may pick this video up.
    pub fn is_transcribable(&self) -> bool {
        matches!(self, VideoStatus::Ready | VideoStatus::Error)
    }

    /// Apply an event, returning the next status or an error if the table has no edge.
    pub fn transition(self, event: LifecycleEvent) -> Result<VideoStatus> {
        use LifecycleEvent::*;
        use VideoStatus::*;

        let next = match (self, event) {
            (_, Vanished) => Some(Missing),
            (_, MetadataExtracted) => Some(Ready),
            (_, MetadataFailed) => Some(Error),
            (Ready | Error, TranscriptionSucceeded) => Some(Transcribed),
            (Ready | Error, TranscriptionFailed) => Some(Error),
            _ => None,
        };

        next.ok_or_else(|| VidscribeError::InvalidTransition {
            from: self.to_string(),
            event: format!("{:?}", event),
        })
    }
}

impl std::fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VideoStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(VideoStatus::New),
            "ready" => Ok(VideoStatus::Ready),
            "transcribed" => Ok(VideoStatus::Transcribed),
            "missing" => Ok(VideoStatus::Missing),
            "error" => Ok(VideoStatus::Error),
            _ => Err(format!("Unknown video status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_path() {
        assert_eq!(
            VideoStatus::New.transition(LifecycleEvent::MetadataExtracted).unwrap(),
            VideoStatus::Ready
        );
        assert_eq!(
            VideoStatus::New.transition(LifecycleEvent::MetadataFailed).unwrap(),
            VideoStatus::Error
        );
    }

    #[test]
    fn test_vanish_from_any_state() {
        for status in VideoStatus::ALL {
            assert_eq!(
                status.transition(LifecycleEvent::Vanished).unwrap(),
                VideoStatus::Missing
            );
        }
    }

    #[test]
    fn test_reappeared_file_is_not_trusted() {
        assert_eq!(
            VideoStatus::Missing.transition(LifecycleEvent::MetadataExtracted).unwrap(),
            VideoStatus::Ready
        );
    }

    #[test]
    fn test_only_ready_or_error_can_be_transcribed() {
        assert!(VideoStatus::Ready.transition(LifecycleEvent::TranscriptionSucceeded).is_ok());
        assert!(VideoStatus::Error.transition(LifecycleEvent::TranscriptionSucceeded).is_ok());
        assert!(VideoStatus::New.transition(LifecycleEvent::TranscriptionSucceeded).is_err());
        assert!(VideoStatus::Missing.transition(LifecycleEvent::TranscriptionFailed).is_err());
        assert!(VideoStatus::Transcribed
            .transition(LifecycleEvent::TranscriptionSucceeded)
            .is_err());
    }

    #[test]
    fn test_status_round_trips_through_text() {
        for status in VideoStatus::ALL {
            assert_eq!(status.as_str().parse::<VideoStatus>().unwrap(), status);
        }
        assert!("Error Transcribing".parse::<VideoStatus>().is_err());
    }
}
