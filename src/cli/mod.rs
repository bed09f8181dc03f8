//! CLI module for vidscribe.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// vidscribe - catalog, transcribe and tag a video library
///
/// Scans a folder of videos, extracts their metadata, transcribes them and
/// files every transcript under a title, a summary and a shared keyword vocabulary.
#[derive(Parser, Debug)]
#[command(name = "vidscribe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "VIDSCRIBE_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan the library and transcribe every video that is ready
    Run {
        /// Only scan the library, do not transcribe
        #[arg(long, conflicts_with = "transcribe_only")]
        scan_only: bool,

        /// Only transcribe videos already in the catalog, do not scan
        #[arg(long)]
        transcribe_only: bool,

        /// Transcribe at most one video
        #[arg(long)]
        single_file: bool,
    },

    /// Transcribe a single video, by catalog id or file path
    Process {
        /// Video id (see `vidscribe list`) or path to a video file
        video: String,
    },

    /// List catalogued videos
    List {
        /// Only show videos in this status (new, ready, transcribed, missing, error)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Inspect the keyword vocabulary
    Keywords {
        #[command(subcommand)]
        action: KeywordsAction,
    },

    /// Print catalog statistics and optionally export a JSON snapshot
    Report {
        /// Write the full snapshot as JSON to this file
        #[arg(short, long)]
        output: Option<String>,

        /// Number of top keywords to show
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Apply pending schema migrations
    Migrate,

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum KeywordsAction {
    /// List keywords with usage counts
    List,

    /// Add a keyword to the vocabulary, or show the entry it already maps to
    Add {
        /// Keyword candidate (e.g. "machine learning")
        candidate: String,
    },

    /// Pin the display casing for a keyword (append-only)
    Override {
        /// Keyword as it may appear in candidates (e.g. "at&t")
        key: String,
        /// Display form to use (e.g. "AT&T")
        display: String,
    },

    /// List casing overrides
    Overrides,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::parse_from(["vidscribe", "-vv", "run", "--single-file"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Run {
                scan_only,
                transcribe_only,
                single_file,
            } => {
                assert!(!scan_only);
                assert!(!transcribe_only);
                assert!(single_file);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_scan_only_conflicts_with_transcribe_only() {
        let result = Cli::try_parse_from(["vidscribe", "run", "--scan-only", "--transcribe-only"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_keyword_override() {
        let cli = Cli::parse_from(["vidscribe", "keywords", "override", "at&t", "AT&T"]);
        match cli.command {
            Commands::Keywords {
                action: KeywordsAction::Override { key, display },
            } => {
                assert_eq!(key, "at&t");
                assert_eq!(display, "AT&T");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_keyword_add() {
        let cli = Cli::parse_from(["vidscribe", "keywords", "add", "machine learning"]);
        match cli.command {
            Commands::Keywords {
                action: KeywordsAction::Add { candidate },
            } => assert_eq!(candidate, "machine learning"),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
