//! OpenAI Whisper transcription implementation.

use super::Transcriber;
use crate::audio::{extract_audio, split_audio};
use crate::config::TranscriptionSettings;
use crate::error::{Result, VidscribeError};
use crate::openai::create_client;
use async_openai::types::{AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// OpenAI Whisper-based transcriber.
pub struct WhisperTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    language: Option<String>,
    chunk_duration_seconds: u32,
    max_concurrent_chunks: usize,
    work_dir: PathBuf,
}

impl WhisperTranscriber {
    /// Create a transcriber that extracts audio under `work_dir`.
    pub fn from_settings(settings: &TranscriptionSettings, work_dir: &Path) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: settings.model.clone(),
            language: settings.language.clone().filter(|l| !l.trim().is_empty()),
            chunk_duration_seconds: settings.chunk_duration_seconds,
            max_concurrent_chunks: settings.max_concurrent_chunks.max(1),
            work_dir: work_dir.to_path_buf(),
        })
    }

    /// Transcribe a single audio file (no splitting).
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe_single(&self, audio_path: &Path) -> Result<String> {
        debug!("Transcribing audio file");

        let file_bytes = tokio::fs::read(audio_path).await?;

        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(async_openai::types::AudioInput::from_vec_u8(
                audio_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.mp3")
                    .to_string(),
                file_bytes,
            ))
            .model(&self.model)
            .response_format(AudioResponseFormat::VerboseJson);

        if let Some(lang) = &self.language {
            request_builder.language(lang);
        }

        let request = request_builder
            .build()
            .map_err(|e| VidscribeError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe_verbose_json(request)
            .await
            .map_err(|e| VidscribeError::OpenAI(format!("Whisper API error: {}", e)))?;

        Ok(response.text.trim().to_string())
    }

    /// Transcribe an audio file, splitting it when it is longer than one chunk.
    async fn transcribe_audio(&self, audio_path: &Path, chunk_dir: &Path) -> Result<String> {
        let chunks = split_audio(audio_path, chunk_dir, self.chunk_duration_seconds).await?;

        if chunks.len() == 1 {
            return self.transcribe_single(audio_path).await;
        }

        let chunk_count = chunks.len();
        info!("Processing {} audio chunks with {}", chunk_count, self.model);

        // Fail fast: the first failing chunk fails the whole video.
        let mut results: Vec<(usize, String)> = Vec::with_capacity(chunk_count);
        let mut stream = stream::iter(chunks.into_iter().enumerate())
            .map(|(idx, (chunk_path, time_offset))| async move {
                let result = self.transcribe_single(&chunk_path).await;
                (idx, time_offset, result)
            })
            .buffer_unordered(self.max_concurrent_chunks);

        while let Some((idx, time_offset, result)) = stream.next().await {
            match result {
                Ok(text) => {
                    debug!("Chunk {}/{} done", idx + 1, chunk_count);
                    results.push((idx, text));
                }
                Err(e) => {
                    return Err(VidscribeError::Transcription(format!(
                        "Chunk {} at {:.0}s failed: {}",
                        idx, time_offset, e
                    )));
                }
            }
        }

        results.sort_by_key(|(idx, _)| *idx);
        Ok(join_chunk_texts(results.into_iter().map(|(_, text)| text)))
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    #[instrument(skip(self), fields(media_path = %media_path.display()))]
    async fn transcribe(&self, media_path: &Path) -> Result<String> {
        std::fs::create_dir_all(&self.work_dir)?;
        // Removed with everything in it when dropped, on success or failure.
        let work = tempfile::Builder::new()
            .prefix("vidscribe-")
            .tempdir_in(&self.work_dir)?;

        let audio = extract_audio(media_path, work.path(), "audio").await?;
        let text = self
            .transcribe_audio(&audio, &work.path().join("chunks"))
            .await?;

        info!("Transcribed {} characters", text.len());
        Ok(text)
    }
}

/// Join per-chunk transcripts in order, skipping silent chunks.
pub fn join_chunk_texts<I>(texts: I) -> String
where
    I: IntoIterator<Item = String>,
{
    texts
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_chunk_texts() {
        let joined = join_chunk_texts(vec![
            " first part. ".to_string(),
            "".to_string(),
            "second part.".to_string(),
        ]);
        assert_eq!(joined, "first part. second part.");
    }
}
