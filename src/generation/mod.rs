//! Title, summary and keyword generation from transcripts.
//!
//! Two providers: the OpenAI chat model (default) and an offline heuristic
//! that needs no API key but produces no keywords.

mod heuristic;
mod openai;

pub use heuristic::HeuristicGenerator;
pub use openai::{parse_generation_response, OpenAIGenerator};

use crate::config::{GenerationProvider, GenerationSettings, Prompts};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Title, summary and keyword candidates for one transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub title: String,
    pub summary: String,
    /// Raw candidates; the vocabulary decides what they become.
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Trait for text-generation services.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate content for a transcript. `existing_keywords` is the current
    /// vocabulary, offered so established keywords are reused.
    async fn generate(
        &self,
        transcript: &str,
        existing_keywords: &[String],
    ) -> Result<GeneratedContent>;
}

/// Build the configured generator.
pub fn create_generator(
    settings: &GenerationSettings,
    prompts: Prompts,
) -> Result<Arc<dyn TextGenerator>> {
    Ok(match settings.provider {
        GenerationProvider::OpenAI => Arc::new(OpenAIGenerator::new(settings.clone(), prompts)?),
        GenerationProvider::Heuristic => {
            Arc::new(HeuristicGenerator::new(settings.summary_max_words))
        }
    })
}

/// Cut `text` to at most `max_words` words, marking the cut with "...".
pub fn limit_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return words.join(" ");
    }
    format!("{}...", words[..max_words].join(" "))
}

/// Cut a transcript to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_words() {
        assert_eq!(limit_words("one  two three", 5), "one two three");
        assert_eq!(limit_words("one two three four", 2), "one two...");
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_create_heuristic_generator_needs_no_client() {
        let settings = GenerationSettings {
            provider: GenerationProvider::Heuristic,
            ..Default::default()
        };
        assert!(create_generator(&settings, Prompts::default()).is_ok());
    }
}
