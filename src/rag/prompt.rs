//! Prompt assembly for the chat operation.

use super::Query;
use crate::config::Prompts;
use crate::vector_store::Passage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Separates consecutive source blocks.
const SOURCE_DELIMITER: &str = "\n\n";

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One message of the instruction sent to the chat model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Builds the user message: instructions, the question, then one labelled
/// block per source in retrieval order.
#[derive(Debug, Clone, Default)]
pub struct UserPromptBuilder {
    instructions: String,
    question: String,
    sources: Vec<String>,
}

impl UserPromptBuilder {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            ..Self::default()
        }
    }

    /// Set the literal question.
    pub fn question(mut self, question: &str) -> Self {
        self.question = question.to_string();
        self
    }

    /// Append one source block.
    ///
    /// Trailing whitespace of the content is dropped; blocks are joined with
    /// a blank line so a block never runs into the next title.
    pub fn source(mut self, title: &str, content: &str) -> Self {
        self.sources.push(format!(
            "SOURCE TITLE: {}\nSOURCE CONTENT: {}",
            title,
            content.trim_end()
        ));
        self
    }

    pub fn sources(self, passages: &[Passage]) -> Self {
        passages
            .iter()
            .fold(self, |builder, p| builder.source(&p.title, &p.content))
    }

    pub fn build(self) -> String {
        let mut out = String::with_capacity(
            self.instructions.len()
                + self.question.len()
                + self.sources.iter().map(|s| s.len() + 2).sum::<usize>()
                + 64,
        );
        out.push_str(self.instructions.trim_end());
        out.push_str("\n\nHere is the IMPORTANT PROMPT: ");
        out.push_str(&self.question);
        out.push_str("\n\nHere are the SOURCES:");
        for block in &self.sources {
            out.push_str(SOURCE_DELIMITER);
            out.push_str(block);
        }
        out
    }
}

/// Turns a query and its passages into the (system, user) message pair.
///
/// Pure: the same inputs always give byte-identical messages.
#[derive(Debug, Clone, Default)]
pub struct PromptAssembler {
    prompts: Prompts,
}

impl PromptAssembler {
    pub fn new(prompts: Prompts) -> Self {
        Self { prompts }
    }

    /// The fixed system message.
    pub fn system_message(&self) -> Message {
        Message::system(
            self.prompts
                .render_with_custom(&self.prompts.chat.system, &HashMap::new()),
        )
    }

    pub fn assemble(&self, query: &Query, passages: &[Passage]) -> (Message, Message) {
        let mut vars = HashMap::new();
        vars.insert("sentences".to_string(), query.sentences.to_string());
        vars.insert("fallback".to_string(), self.prompts.chat.fallback.clone());
        let instructions = self
            .prompts
            .render_with_custom(&self.prompts.chat.instructions, &vars);

        let user = UserPromptBuilder::new(instructions)
            .question(&query.prompt)
            .sources(passages)
            .build();

        (self.system_message(), Message::user(user))
    }
}
