//! Prompt templates for course-rag.
//!
//! Prompts can be customized by placing a `chat.toml` file in the custom
//! prompts directory.

use crate::error::{CourseRagError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Answer given by the model when the sources do not contain an answer.
///
/// Clients match on this exact sentence.
pub const DEFAULT_FALLBACK: &str = "Sorry, I could not find an answer from the MIT course content.";

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub chat: ChatPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the chat operation.
///
/// `instructions` may use `{{sentences}}` (the upper-cased answer length)
/// and `{{fallback}}`; the question and sources are appended after it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatPrompts {
    pub system: String,
    pub instructions: String,
    pub fallback: String,
}

impl Default for ChatPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a helpful and knowledgeable MIT professor that helps students with their questions about MIT courses.
In your responses, when you want to include a header, include it like: # [your header].
When you want to include a sub-header, include it like: ## [your sub-header].
When you want to include a piece of code, include it like: ```[your entire code bit]```.
MAKE SURE TO FORMAT ALL CODE CORRECTLY!!! INCLUDE PROPER INDENTING AND SPACING!!!
For bold text, just render it like **bold text**. Render ordered/unordered lists in Markdown.
For links, render as [link title](https://www.example.com).
Essentially just give your entire response as a Markdown document."#.to_string(),

            instructions: r#"Please answer the following IMPORTANT PROMPT truthfully and as accurately as possible.
Use the following sources (which shall be denoted with a SOURCE TITLE and SOURCE CONTENT).
Try to not directly copy the sources word-for-word. Remember, you help learners with their questions
about the MIT course content and TRY TO USE THE SOURCES AS CONTEXT to the best of your ability. However, you want to
mainly focus on answering the user prompt. Do not randomly use the sources that have nothing to
do with the question asked by the user. You do not have to explicitly
mention the source names and which sources you used in your answer. If the answer cannot be found in the sources, RESPOND ONLY WITH "{{fallback}}"
PLEASE MAKE THE RESPONSE A {{sentences}} {{sentences}} {{sentences}} LENGTH THIS IS VERY IMPORTANT!!!
If you are giving a SHORT or MEDIUM response, do not add a long response with [Answer] or an "Answer" heading.
Always try to keep track of your response length especially before you give the response."#.to_string(),

            fallback: DEFAULT_FALLBACK.to_string(),
        }
    }
}

impl ChatPrompts {
    /// Reject instructions that lose the length directive or the fallback answer.
    pub fn check(&self) -> Result<()> {
        if self.instructions.matches("{{sentences}}").count() < 3 {
            return Err(CourseRagError::Config(
                "chat instructions must repeat {{sentences}} three times".to_string(),
            ));
        }
        if !self.instructions.contains("{{fallback}}") || self.fallback.trim().is_empty() {
            return Err(CourseRagError::Config(
                "chat instructions must include a non-empty {{fallback}}".to_string(),
            ));
        }
        Ok(())
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let chat_path = custom_path.join("chat.toml");
            if chat_path.exists() {
                let content = std::fs::read_to_string(&chat_path)?;
                prompts.chat = toml::from_str(&content)?;
                prompts.chat.check()?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are resolved in one pass over the template, so values are
    /// inserted verbatim even when they contain `{{...}}` themselves. Unknown
    /// placeholders are left as written.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => match vars.get(&after[..end]) {
                    Some(value) => {
                        result.push_str(value);
                        rest = &after[end + 2..];
                    }
                    None => {
                        result.push_str("{{");
                        rest = after;
                    }
                },
                None => {
                    result.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        result.push_str(rest);
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
