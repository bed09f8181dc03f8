//! Prompt templates for vidscribe.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    /// Prompts for title, summary and keyword generation.
    pub generation: GenerationPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}


/// Prompts for title, summary and keyword generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationPrompts {
    pub system: String,
    pub user: String,
}

impl Default for GenerationPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a media cataloging specialist who creates concise titles, informative summaries and relevant keywords for video transcripts.

Guidelines:
- The title is short and meaningful (10 words or fewer)
- The summary captures the essence of the content in {{summary_max_words}} words or fewer
- Keywords are single words or short phrases (2-3 words at most)
- Prefer keywords from the existing vocabulary when they fit; only invent new ones when nothing fits
- Never add content that is not present in the transcript

Respond with a single JSON object and nothing else."#.to_string(),

            user: r#"Here is a transcript of a video.

Existing keywords in the catalog:
{{existing_keywords}}

Provide up to {{max_keywords}} keywords that best represent the main topics.

Respond exactly in this shape:
{"title": "...", "summary": "...", "keywords": ["...", "..."]}

Transcript:
{{transcript}}"#.to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let generation_path = custom_path.join("generation.toml");
            if generation_path.exists() {
                let content = std::fs::read_to_string(&generation_path)?;
                prompts.generation = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.generation.user.contains("{{transcript}}"));
        assert!(prompts.generation.user.contains("{{existing_keywords}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Up to {{max_keywords}} keywords for {{channel}}.";
        let mut vars = HashMap::new();
        vars.insert("max_keywords".to_string(), "5".to_string());

        let mut prompts = Prompts::default();
        prompts.variables.insert("channel".to_string(), "Town Hall".to_string());
        prompts.variables.insert("max_keywords".to_string(), "99".to_string());

        let result = prompts.render_with_custom(template, &vars);
        assert_eq!(result, "Up to 5 keywords for Town Hall.");
    }

    #[test]
    fn test_load_custom_generation_prompt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("generation.toml"),
            "system = \"Be brief.\"\nuser = \"{{transcript}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.generation.system, "Be brief.");
        assert_eq!(prompts.generation.user, "{{transcript}}");
    }
}
