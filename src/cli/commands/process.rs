//! Process command: transcribe one video.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, ProcessOutcome};
use anyhow::Result;

/// Run the process command. `video` is a catalog id or a file path.
pub async fn run_process(video: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Transcribe) {
        Output::error(&format!("{}", e));
        Output::info("Run 'vidscribe doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let video = match video.parse::<i64>() {
        Ok(id) => orchestrator.catalog().get_video(id)?,
        Err(_) => {
            orchestrator
                .register_file(&Settings::expand_path(video))
                .await?
        }
    };
    Output::info(&format!("Processing: {}", video.filename));

    match orchestrator.process(video.id).await? {
        ProcessOutcome::Transcribed {
            title,
            keywords,
            transcript_file,
            ..
        } => {
            Output::success(&format!("Transcribed '{}'", title));
            Output::kv(
                "Keywords",
                &if keywords.is_empty() {
                    "none".to_string()
                } else {
                    keywords.join(", ")
                },
            );
            Output::kv("Transcript", &transcript_file.display().to_string());
        }
        ProcessOutcome::Failed { message } => {
            Output::error(&format!("Failed: {}", message));
            anyhow::bail!("transcription of video {} failed", video.id);
        }
        ProcessOutcome::Skipped { reason } => {
            Output::warning(&format!("Skipped: {}", reason));
        }
    }

    Ok(())
}
