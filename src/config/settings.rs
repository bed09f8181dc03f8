//! Configuration settings for vidscribe.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub library: LibrarySettings,
    pub database: DatabaseSettings,
    pub transcription: TranscriptionSettings,
    pub generation: GenerationSettings,
    pub prompts: PromptSettings,
}


/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for temporary files (extracted audio).
    pub temp_dir: String,
    /// Log level when no -v flag is given (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.vidscribe".to_string(),
            temp_dir: "/tmp/vidscribe".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Where the video library lives and where transcripts go.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Folder scanned (recursively) for video files.
    pub input_dir: String,
    /// Folder receiving one markdown transcript per transcribed video.
    pub transcripts_dir: String,
    /// File extensions treated as videos (case-insensitive, no dot).
    pub extensions: Vec<String>,
    /// Follow symbolic links while scanning.
    pub follow_links: bool,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            input_dir: "~/Videos".to_string(),
            transcripts_dir: "~/.vidscribe/transcripts".to_string(),
            extensions: ["mp4", "avi", "mov", "mkv", "webm", "flv", "wmv", "m4v"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            follow_links: false,
        }
    }
}

/// Catalog database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Path to the SQLite catalog.
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "~/.vidscribe/video_library.db".to_string(),
        }
    }
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
    /// Language hint passed to the service (ISO-639-1), if any.
    pub language: Option<String>,
    /// Duration in seconds for splitting long audio tracks.
    pub chunk_duration_seconds: u32,
    /// Maximum concurrent chunk requests.
    pub max_concurrent_chunks: usize,
    /// Maximum video duration to transcribe (in seconds).
    pub max_duration_seconds: u32,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            language: Some("en".to_string()),
            chunk_duration_seconds: 600,
            max_concurrent_chunks: 3,
            max_duration_seconds: 14400, // 4 hours
        }
    }
}

/// Text generation provider type.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    /// OpenAI chat completion (default).
    #[default]
    OpenAI,
    /// Offline heuristic: first words as title, leading sentences as summary, no keywords.
    Heuristic,
}

impl std::str::FromStr for GenerationProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "gpt" => Ok(GenerationProvider::OpenAI),
            "heuristic" | "offline" => Ok(GenerationProvider::Heuristic),
            _ => Err(format!("Unknown generation provider: {}", s)),
        }
    }
}

impl std::fmt::Display for GenerationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationProvider::OpenAI => write!(f, "openai"),
            GenerationProvider::Heuristic => write!(f, "heuristic"),
        }
    }
}

/// Title / summary / keyword generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Which generator to use.
    pub provider: GenerationProvider,
    /// Chat model for the OpenAI provider.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum keywords kept per transcription.
    pub max_keywords: usize,
    /// Transcript characters sent to the model.
    pub max_transcript_chars: usize,
    /// Summary word budget.
    pub summary_max_words: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::OpenAI,
            model: "gpt-4o".to_string(),
            temperature: 0.7,
            max_keywords: 5,
            max_transcript_chars: 14000,
            summary_max_words: 30,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}


impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::VidscribeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vidscribe")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded input (video library) directory.
    pub fn input_dir(&self) -> PathBuf {
        Self::expand_path(&self.library.input_dir)
    }

    /// Get the expanded transcripts directory.
    pub fn transcripts_dir(&self) -> PathBuf {
        Self::expand_path(&self.library.transcripts_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn database_path(&self) -> PathBuf {
        Self::expand_path(&self.database.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [library]
            input_dir = "/srv/videos"

            [generation]
            provider = "heuristic"
            "#,
        )
        .unwrap();

        assert_eq!(settings.library.input_dir, "/srv/videos");
        assert_eq!(settings.library.extensions.len(), 8);
        assert_eq!(settings.generation.provider, GenerationProvider::Heuristic);
        assert_eq!(settings.generation.max_keywords, 5);
        assert_eq!(settings.transcription.model, "whisper-1");
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("OpenAI".parse::<GenerationProvider>().unwrap(), GenerationProvider::OpenAI);
        assert_eq!("offline".parse::<GenerationProvider>().unwrap(), GenerationProvider::Heuristic);
        assert!("bard".parse::<GenerationProvider>().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.library.transcripts_dir = "/data/md".to_string();
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.library.transcripts_dir, "/data/md");
    }
}
