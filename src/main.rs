//! vidscribe CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vidscribe::cli::{commands, Cli, Commands};
use vidscribe::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.as_deref().map(Settings::expand_path);

    // Load configuration
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("vidscribe={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Ensure data directories exist
    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.temp_dir())?;

    // Execute command
    match &cli.command {
        Commands::Run {
            scan_only,
            transcribe_only,
            single_file,
        } => {
            commands::run_pipeline(*scan_only, *transcribe_only, *single_file, settings).await?;
        }

        Commands::Process { video } => {
            commands::run_process(video, settings).await?;
        }

        Commands::List { status } => {
            commands::run_list(status.as_deref(), &settings)?;
        }

        Commands::Keywords { action } => {
            commands::run_keywords(action, &settings)?;
        }

        Commands::Report { output, top } => {
            commands::run_report(output.as_deref(), *top, &settings)?;
        }

        Commands::Migrate => {
            commands::run_migrate(&settings)?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, config_path, &settings)?;
        }
    }

    Ok(())
}
