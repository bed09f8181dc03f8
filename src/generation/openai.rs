//! OpenAI chat-completion generator.

use super::{limit_words, truncate_chars, GeneratedContent, TextGenerator};
use crate::config::{GenerationSettings, Prompts};
use crate::error::{Result, VidscribeError};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Generator backed by an OpenAI chat model.
pub struct OpenAIGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    settings: GenerationSettings,
    prompts: Prompts,
}

impl OpenAIGenerator {
    pub fn new(settings: GenerationSettings, prompts: Prompts) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            settings,
            prompts,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAIGenerator {
    #[instrument(skip_all, fields(model = %self.settings.model))]
    async fn generate(
        &self,
        transcript: &str,
        existing_keywords: &[String],
    ) -> Result<GeneratedContent> {
        if transcript.trim().is_empty() {
            return Err(VidscribeError::Generation("transcript is empty".into()));
        }

        let mut vars = HashMap::new();
        vars.insert(
            "transcript".to_string(),
            truncate_chars(transcript, self.settings.max_transcript_chars).to_string(),
        );
        vars.insert(
            "existing_keywords".to_string(),
            if existing_keywords.is_empty() {
                "No existing keywords yet".to_string()
            } else {
                existing_keywords.join(", ")
            },
        );
        vars.insert(
            "max_keywords".to_string(),
            self.settings.max_keywords.to_string(),
        );
        vars.insert(
            "summary_max_words".to_string(),
            self.settings.summary_max_words.to_string(),
        );

        let system_message = self
            .prompts
            .render_with_custom(&self.prompts.generation.system, &vars);
        let user_message = self
            .prompts
            .render_with_custom(&self.prompts.generation.user, &vars);

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_message)
                .build()
                .map_err(|e| VidscribeError::Generation(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_message)
                .build()
                .map_err(|e| VidscribeError::Generation(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.settings.model)
            .messages(messages)
            .temperature(self.settings.temperature)
            .build()
            .map_err(|e| VidscribeError::Generation(e.to_string()))?;

        info!("Generating title, summary and keywords");

        let response = self.client.chat().create(request).await.map_err(|e| {
            VidscribeError::OpenAI(format!("Failed to get generation response: {}", e))
        })?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| VidscribeError::Generation("Empty response from LLM".to_string()))?;

        debug!("LLM generation response: {}", truncate_chars(content, 500));

        parse_generation_response(
            content,
            self.settings.summary_max_words,
            self.settings.max_keywords,
        )
    }
}

/// Parse a model response into [`GeneratedContent`].
///
/// Accepts the JSON object the prompt asks for, or the older
/// `TITLE:` / `SUMMARY:` / `KEYWORDS:` line format. The summary is cut to
/// `summary_max_words` and keywords to `max_keywords`.
pub fn parse_generation_response(
    response: &str,
    summary_max_words: usize,
    max_keywords: usize,
) -> Result<GeneratedContent> {
    let mut content = parse_json(response)
        .or_else(|| parse_legacy(response))
        .ok_or_else(|| {
            VidscribeError::Generation(format!(
                "Failed to parse generation response: {}",
                truncate_chars(response, 500)
            ))
        })?;

    content.title = content.title.trim().trim_matches('"').trim().to_string();
    if content.title.is_empty() {
        return Err(VidscribeError::Generation(
            "generation response has no title".into(),
        ));
    }

    content.summary = limit_words(content.summary.trim(), summary_max_words);
    content.keywords = content
        .keywords
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .take(max_keywords)
        .collect();

    Ok(content)
}

fn parse_json(response: &str) -> Option<GeneratedContent> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&response[start..=end]).ok()
}

fn parse_legacy(response: &str) -> Option<GeneratedContent> {
    let field = Regex::new(r"(?im)^\s*(TITLE|SUMMARY|KEYWORDS)\s*:\s*").ok()?;
    let markers: Vec<(String, usize, usize)> = field
        .captures_iter(response)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?.as_str().to_uppercase();
            Some((name, whole.start(), whole.end()))
        })
        .collect();

    let mut content = GeneratedContent::default();
    let mut found_title = false;

    for (i, (name, _, value_start)) in markers.iter().enumerate() {
        let value_end = markers
            .get(i + 1)
            .map(|(_, next_start, _)| *next_start)
            .unwrap_or(response.len());
        let value = response[*value_start..value_end].trim();

        match name.as_str() {
            "TITLE" => {
                content.title = value.to_string();
                found_title = true;
            }
            "SUMMARY" => content.summary = value.to_string(),
            "KEYWORDS" => {
                content.keywords = value
                    .split([',', '\n'])
                    .map(|k| k.trim().trim_start_matches(['-', '*']).trim().to_string())
                    .collect()
            }
            _ => {}
        }
    }

    found_title.then_some(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_response() {
        let response = r#"Sure! {"title": "Greeting", "summary": "A short greeting.", "keywords": ["greeting", "Greeting"]}"#;
        let content = parse_generation_response(response, 30, 5).unwrap();
        assert_eq!(content.title, "Greeting");
        assert_eq!(content.summary, "A short greeting.");
        assert_eq!(content.keywords, vec!["greeting", "Greeting"]);
    }

    #[test]
    fn test_parse_fenced_json_without_keywords() {
        let response = "```json\n{\"title\": \"Only Title\", \"summary\": \"Text\"}\n```";
        let content = parse_generation_response(response, 30, 5).unwrap();
        assert_eq!(content.title, "Only Title");
        assert!(content.keywords.is_empty());
    }

    #[test]
    fn test_parse_legacy_lines() {
        let response = "TITLE: Cooking Pasta\nSUMMARY: How to boil\n water properly.\nKEYWORDS: cooking, pasta, , italian food";
        let content = parse_generation_response(response, 30, 5).unwrap();
        assert_eq!(content.title, "Cooking Pasta");
        assert_eq!(content.summary, "How to boil water properly.");
        assert_eq!(content.keywords, vec!["cooking", "pasta", "italian food"]);
    }

    #[test]
    fn test_limits_are_applied() {
        let words = vec!["word"; 40].join(" ");
        let response = format!(
            r#"{{"title": "T", "summary": "{}", "keywords": ["a", "b", "c", "d", "e", "f", "g"]}}"#,
            words
        );
        let content = parse_generation_response(&response, 30, 5).unwrap();
        assert!(content.summary.ends_with("..."));
        assert_eq!(content.summary.split_whitespace().count(), 30);
        assert_eq!(content.keywords.len(), 5);
    }

    #[test]
    fn test_malformed_response_is_a_generation_error() {
        let err = parse_generation_response("I cannot help with that.", 30, 5).unwrap_err();
        assert!(matches!(err, VidscribeError::Generation(_)));

        let err = parse_generation_response(r#"{"title": "", "summary": "x"}"#, 30, 5).unwrap_err();
        assert!(matches!(err, VidscribeError::Generation(_)));
    }
}
