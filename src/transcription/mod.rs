//! Speech-to-text for video soundtracks.

mod whisper;

pub use whisper::{join_chunk_texts, WhisperTranscriber};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the spoken audio of a media file to plain text.
    async fn transcribe(&self, media_path: &Path) -> Result<String>;
}
