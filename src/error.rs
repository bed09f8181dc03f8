//! Error types for vidscribe.

use thiserror::Error;

/// Library-level error type for vidscribe operations.
#[derive(Error, Debug)]
pub enum VidscribeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Metadata probe failed: {0}")]
    Probe(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Text generation failed: {0}")]
    Generation(String),

    #[error("Video {0} is already being processed")]
    LockContention(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Invalid status transition: {from} cannot handle {event}")]
    InvalidTransition { from: String, event: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Video not found: {0}")]
    VideoNotFound(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl VidscribeError {
    /// Errors that belong to a single video: recorded as its `error_message`,
    /// the batch moves on to the next video.
    pub fn is_per_video(&self) -> bool {
        matches!(
            self,
            VidscribeError::Probe(_)
                | VidscribeError::Transcription(_)
                | VidscribeError::Generation(_)
                | VidscribeError::OpenAI(_)
                | VidscribeError::ToolFailed(_)
                | VidscribeError::Io(_)
                | VidscribeError::Http(_)
        )
    }
}

/// Result type alias for vidscribe operations.
pub type Result<T> = std::result::Result<T, VidscribeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_video_classification() {
        assert!(VidscribeError::Probe("corrupt".into()).is_per_video());
        assert!(VidscribeError::Generation("timeout".into()).is_per_video());
        assert!(!VidscribeError::Schema("bad".into()).is_per_video());
        assert!(!VidscribeError::LockContention("a.mp4".into()).is_per_video());
    }
}
