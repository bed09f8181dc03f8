//! vidscribe - catalog, transcribe and tag a video library
//!
//! A local-first CLI tool that keeps a SQLite catalog of a folder of videos,
//! transcribes them and files each transcript under a generated title, a
//! summary and keywords drawn from one controlled vocabulary.
//!
//! # Architecture
//!
//! - `catalog` - SQLite store, schema migrations and per-video processing locks
//! - `vocabulary` - keyword normalization, casing and deduplication
//! - `lifecycle` - video status state machine and library scanner
//! - `probe` - ffprobe metadata extraction
//! - `audio` - ffmpeg audio extraction and splitting
//! - `transcription` - speech-to-text
//! - `generation` - title, summary and keyword generation
//! - `artifact` - markdown transcript files
//! - `orchestrator` - per-video pipeline and batch runs
//! - `report` - read-only catalog snapshots
//!
//! # Example
//!
//! ```rust,no_run
//! use vidscribe::config::Settings;
//! use vidscribe::orchestrator::{Orchestrator, RunMode};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let summary = orchestrator.run(RunMode::default()).await?;
//!     println!("Transcribed {} videos", summary.transcribed);
//!
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod audio;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod lifecycle;
pub mod openai;
pub mod orchestrator;
pub mod probe;
pub mod report;
pub mod transcription;
pub mod vocabulary;

pub use error::{Result, VidscribeError};
