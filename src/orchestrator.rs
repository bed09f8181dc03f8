//! Pipeline orchestrator for vidscribe.
//!
//! Coordinates scanning and, per video, transcription, text generation and
//! the atomic catalog commit.

use crate::artifact::{artifact_file_name, render_markdown, write_artifact};
use crate::catalog::{Catalog, NewTranscription, Video};
use crate::config::{Prompts, Settings};
use crate::error::{Result, VidscribeError};
use crate::generation::{create_generator, TextGenerator};
use crate::lifecycle::{FileStat, LifecycleManager, ScanSummary, VideoStatus};
use crate::probe::{FfprobeProbe, MetadataProbe};
use crate::transcription::{Transcriber, WhisperTranscriber};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// The main orchestrator for the vidscribe pipeline.
pub struct Orchestrator {
    settings: Settings,
    catalog: Arc<Catalog>,
    lifecycle: LifecycleManager,
    transcriber: Arc<dyn Transcriber>,
    generator: Arc<dyn TextGenerator>,
    transcripts_dir: PathBuf,
}

/// Result of one `process` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ProcessOutcome {
    Transcribed {
        transcription_id: i64,
        title: String,
        keywords: Vec<String>,
        transcript_file: PathBuf,
    },
    /// Recorded on the video as ERROR with this message.
    Failed { message: String },
    /// Nothing to do: not READY/ERROR, or the file is gone.
    Skipped { reason: String },
}

/// Which phases a batch run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunMode {
    pub scan: bool,
    pub transcribe: bool,
    /// Transcribe at most one video.
    pub single_file: bool,
}

impl Default for RunMode {
    fn default() -> Self {
        Self {
            scan: true,
            transcribe: true,
            single_file: false,
        }
    }
}

/// Counts from a batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub scan: Option<ScanSummary>,
    pub transcribed: usize,
    pub failed: usize,
    /// Locked elsewhere, no longer eligible, or gone from disk.
    pub skipped: usize,
}

impl Orchestrator {
    /// Create an orchestrator with the OpenAI-backed services from `settings`.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let catalog = Arc::new(Catalog::open(&settings.database_path())?);

        let temp_dir = settings.temp_dir();
        std::fs::create_dir_all(&temp_dir)?;

        let transcriber: Arc<dyn Transcriber> = Arc::new(WhisperTranscriber::from_settings(
            &settings.transcription,
            &temp_dir,
        )?);
        let generator = create_generator(&settings.generation, prompts)?;

        Ok(Self::with_components(
            settings,
            catalog,
            Arc::new(FfprobeProbe::new()),
            transcriber,
            generator,
        ))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        catalog: Arc<Catalog>,
        probe: Arc<dyn MetadataProbe>,
        transcriber: Arc<dyn Transcriber>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let transcripts_dir = settings.transcripts_dir();
        Self {
            lifecycle: LifecycleManager::new(Arc::clone(&catalog), probe),
            settings,
            catalog,
            transcriber,
            generator,
            transcripts_dir,
        }
    }

    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Scan the configured library directory.
    pub async fn scan(&self) -> Result<ScanSummary> {
        self.lifecycle
            .scan(
                &self.settings.input_dir(),
                &self.settings.library.extensions,
                self.settings.library.follow_links,
            )
            .await
    }

    /// Register or refresh one file, outside of a full library scan.
    pub async fn register_file(&self, path: &Path) -> Result<Video> {
        let (outcome, video) = self.lifecycle.scan_file(path).await?;
        debug!(?outcome, "Registered {:?}", path);
        video.ok_or_else(|| VidscribeError::LockContention(path.display().to_string()))
    }

    /// Transcribe one READY or ERROR video.
    ///
    /// Holds the video's processing lock throughout; a second concurrent call
    /// fails with [`VidscribeError::LockContention`]. Per-video failures are
    /// recorded on the video and returned as [`ProcessOutcome::Failed`];
    /// errors that would fail every video (missing tools, broken catalog)
    /// are returned as `Err`.
    #[instrument(skip(self))]
    pub async fn process(&self, video_id: i64) -> Result<ProcessOutcome> {
        let _lock = self.catalog.try_lock_video(video_id)?;

        let video = self.catalog.get_video(video_id)?;
        if !video.status.is_transcribable() {
            return Ok(ProcessOutcome::Skipped {
                reason: format!("status is {}", video.status),
            });
        }

        match self.transcribe_video(video).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_per_video() || matches!(e, VidscribeError::Database(_)) => {
                let message = e.to_string();
                self.catalog.record_transcription_failure(video_id, &message)?;
                Ok(ProcessOutcome::Failed { message })
            }
            Err(e) => Err(e),
        }
    }

    async fn transcribe_video(&self, video: Video) -> Result<ProcessOutcome> {
        if !video.path.exists() {
            self.catalog.mark_missing(video.id)?;
            return Ok(ProcessOutcome::Skipped {
                reason: "file is missing".to_string(),
            });
        }

        let video = if video.metadata.is_none() || video.status == VideoStatus::Error {
            let stat = FileStat::from_path(&video.path)?;
            let refreshed = self.lifecycle.extract_metadata(&video, &stat).await?;
            if refreshed.status == VideoStatus::Error {
                return Ok(ProcessOutcome::Failed {
                    message: refreshed.error_message.unwrap_or_default(),
                });
            }
            refreshed
        } else {
            video
        };

        if let Some(meta) = &video.metadata {
            let limit = self.settings.transcription.max_duration_seconds as f64;
            if meta.duration_seconds > limit {
                return Err(VidscribeError::Transcription(format!(
                    "duration {:.0}s exceeds maximum {:.0}s",
                    meta.duration_seconds, limit
                )));
            }
        }

        info!("Transcribing {}", video.filename);
        let transcript = self.transcriber.transcribe(&video.path).await?;

        let existing = self.catalog.keyword_displays()?;
        let content = self.generator.generate(&transcript, &existing).await?;

        let new = NewTranscription {
            transcript_text: transcript.clone(),
            title: content.title.clone(),
            summary: content.summary.clone(),
        };
        let dir = self.transcripts_dir.clone();

        let (transcription, keywords) = self.catalog.commit_transcription(
            video.id,
            &new,
            &content.keywords,
            |video, keywords| {
                let body = render_markdown(video, &content, keywords, &transcript, Local::now());
                write_artifact(&dir, &artifact_file_name(&video.path), &body)
            },
        )?;

        Ok(ProcessOutcome::Transcribed {
            transcription_id: transcription.id,
            title: transcription.title,
            keywords: keywords.into_iter().map(|k| k.display).collect(),
            transcript_file: transcription.transcript_file,
        })
    }

    /// Run a batch: scan, then process every transcribable video once.
    pub async fn run(&self, mode: RunMode) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        if mode.scan {
            summary.scan = Some(self.scan().await?);
        }
        if !mode.transcribe {
            return Ok(summary);
        }

        let mut queue = self.catalog.transcribable_videos()?;
        if let Some(scan) = &summary.scan {
            // Probed and failed moments ago; retry on the next run.
            queue.retain(|v| !scan.failed_ids.contains(&v.id));
        }
        if mode.single_file {
            let discovered = summary
                .scan
                .as_ref()
                .map(|s| s.discovered_ids.clone())
                .unwrap_or_default();
            let pick = queue
                .iter()
                .position(|v| discovered.contains(&v.id))
                .unwrap_or(0);
            queue = queue.into_iter().skip(pick).take(1).collect();
        }

        if queue.is_empty() {
            info!("No videos waiting for transcription");
            return Ok(summary);
        }

        let pb = ProgressBar::new(queue.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} Transcribing [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .map(|style| style.progress_chars("█▓░"))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        for video in queue {
            pb.set_message(video.filename.clone());

            match self.process(video.id).await {
                Ok(ProcessOutcome::Transcribed { title, .. }) => {
                    info!("Transcribed {} as {:?}", video.filename, title);
                    summary.transcribed += 1;
                }
                Ok(ProcessOutcome::Failed { message }) => {
                    error!("Failed to transcribe {}: {}", video.filename, message);
                    summary.failed += 1;
                }
                Ok(ProcessOutcome::Skipped { reason }) => {
                    info!("Skipped {}: {}", video.filename, reason);
                    summary.skipped += 1;
                }
                Err(VidscribeError::LockContention(_)) => {
                    warn!("Skipped {}: already being processed", video.filename);
                    summary.skipped += 1;
                }
                Err(e) => {
                    pb.finish_and_clear();
                    return Err(e);
                }
            }

            pb.inc(1);
        }

        pb.finish_and_clear();
        Ok(summary)
    }
}
