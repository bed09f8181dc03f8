//! Run command: scan the library and transcribe what is ready.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, RunMode};
use anyhow::Result;

/// Run the batch pipeline.
pub async fn run_pipeline(
    scan_only: bool,
    transcribe_only: bool,
    single_file: bool,
    settings: Settings,
) -> Result<()> {
    let mode = RunMode {
        scan: !transcribe_only,
        transcribe: !scan_only,
        single_file,
    };

    let operation = if mode.transcribe {
        Operation::Transcribe
    } else {
        Operation::Scan
    };
    if let Err(e) = preflight::check(operation) {
        Output::error(&format!("{}", e));
        Output::info("Run 'vidscribe doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    if mode.scan {
        Output::info(&format!(
            "Scanning {}",
            settings.input_dir().display()
        ));
    }

    let orchestrator = Orchestrator::new(settings)?;
    let summary = orchestrator.run(mode).await?;

    if let Some(scan) = &summary.scan {
        Output::header("Scan");
        Output::kv("Discovered", &scan.discovered.to_string());
        Output::kv("Changed", &scan.changed.to_string());
        Output::kv("Restored", &scan.restored.to_string());
        Output::kv("Unchanged", &scan.unchanged.to_string());
        Output::kv("Missing", &scan.missing.to_string());
        if scan.failed > 0 {
            Output::kv("Metadata errors", &scan.failed.to_string());
        }
        if scan.skipped > 0 {
            Output::kv("Skipped (locked)", &scan.skipped.to_string());
        }
    }

    if mode.transcribe {
        Output::header("Transcription");
        Output::kv("Transcribed", &summary.transcribed.to_string());
        Output::kv("Errors", &summary.failed.to_string());
        Output::kv("Skipped", &summary.skipped.to_string());
        println!();

        if summary.failed > 0 {
            Output::warning(&format!(
                "{} video(s) failed. See 'vidscribe list --status error'.",
                summary.failed
            ));
        } else {
            Output::success("Done.");
        }
    }

    Ok(())
}
