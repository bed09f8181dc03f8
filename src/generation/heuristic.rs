//! Offline generator: no model, no keywords.

use super::{GeneratedContent, TextGenerator};
use crate::error::Result;
use async_trait::async_trait;

const TITLE_WORDS: usize = 7;

/// Derives a title from the opening words and a summary from the leading
/// sentences of the transcript.
#[derive(Debug, Clone)]
pub struct HeuristicGenerator {
    summary_max_words: usize,
}

impl HeuristicGenerator {
    pub fn new(summary_max_words: usize) -> Self {
        Self { summary_max_words }
    }

    fn title(transcript: &str) -> String {
        let title = transcript
            .split_whitespace()
            .take(TITLE_WORDS)
            .collect::<Vec<_>>()
            .join(" ");
        let title = title.trim_end_matches([',', '.', '!', '?', ':', ';']);

        let mut chars = title.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    fn summary(&self, transcript: &str) -> String {
        let mut summary: Vec<String> = Vec::new();
        let mut word_count = 0;

        for sentence in transcript.split('.') {
            let words: Vec<&str> = sentence.split_whitespace().collect();
            if words.is_empty() {
                continue;
            }

            if word_count + words.len() <= self.summary_max_words {
                let sentence = words.join(" ");
                if sentence.ends_with(['!', '?']) {
                    summary.push(sentence);
                } else {
                    summary.push(format!("{}.", sentence));
                }
                word_count += words.len();
            } else {
                let remaining = self.summary_max_words - word_count;
                if remaining > 0 {
                    summary.push(format!("{}...", words[..remaining].join(" ")));
                }
                break;
            }
        }

        summary.join(" ")
    }
}

#[async_trait]
impl TextGenerator for HeuristicGenerator {
    async fn generate(
        &self,
        transcript: &str,
        _existing_keywords: &[String],
    ) -> Result<GeneratedContent> {
        if transcript.trim().is_empty() {
            return Ok(GeneratedContent {
                title: "Untitled Video".to_string(),
                summary: "No transcript available".to_string(),
                keywords: Vec::new(),
            });
        }

        Ok(GeneratedContent {
            title: Self::title(transcript),
            summary: self.summary(transcript),
            keywords: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_transcript() {
        let content = HeuristicGenerator::new(30).generate("  ", &[]).await.unwrap();
        assert_eq!(content.title, "Untitled Video");
        assert_eq!(content.summary, "No transcript available");
    }

    #[tokio::test]
    async fn test_title_and_summary() {
        let generator = HeuristicGenerator::new(8);
        let transcript = "welcome to the show. today we talk about rust and sqlite in depth.";

        let content = generator.generate(transcript, &[]).await.unwrap();
        assert_eq!(content.title, "Welcome to the show. today we talk");
        assert_eq!(content.summary, "welcome to the show. today we talk about...");
        assert!(content.keywords.is_empty());
    }

    #[tokio::test]
    async fn test_short_title_drops_trailing_punctuation() {
        let content = HeuristicGenerator::new(30)
            .generate("hello world!", &[])
            .await
            .unwrap();
        assert_eq!(content.title, "Hello world");
        assert_eq!(content.summary, "hello world!");
    }
}
