//! Configuration module for vidscribe.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{GenerationPrompts, Prompts};
pub use settings::{
    DatabaseSettings, GeneralSettings, GenerationProvider, GenerationSettings, LibrarySettings,
    PromptSettings, Settings, TranscriptionSettings,
};
