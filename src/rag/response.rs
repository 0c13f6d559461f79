//! Response shapes returned to callers.

use super::Message;
use crate::vector_store::Passage;
use serde::{Deserialize, Serialize};

/// Result of the search operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub sources: Vec<Passage>,
}

/// Result of the chat operation: the instruction to send to a chat model and
/// the passages it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResult {
    pub messages: Vec<Message>,
    pub sources: Vec<Passage>,
}

/// Shape retrieved passages as a search result. Order is preserved.
pub fn search_result(passages: Vec<Passage>) -> SearchResult {
    SearchResult { sources: passages }
}

/// Shape an assembled prompt and its passages as a chat result.
pub fn chat_result(system: Message, user: Message, passages: Vec<Passage>) -> ChatResult {
    ChatResult {
        messages: vec![system, user],
        sources: passages,
    }
}

/// A generated answer with the passages it was grounded on.
#[derive(Debug, Clone)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<Passage>,
}

impl Answer {
    /// Format the answer for display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();

        if !self.sources.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            for source in &self.sources {
                output.push_str(&format!(
                    "\n{} (similarity: {:.2})",
                    source.title, source.similarity
                ));
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::Role;

    fn passages() -> Vec<Passage> {
        vec![
            Passage {
                title: "Lecture 1".to_string(),
                content: "A.".to_string(),
                similarity: 0.9,
            },
            Passage {
                title: "Lecture 2".to_string(),
                content: "B.".to_string(),
                similarity: 0.8,
            },
        ]
    }

    #[test]
    fn test_search_result_json_shape() {
        let json = serde_json::to_value(search_result(passages())).unwrap();
        assert_eq!(json["sources"][0]["title"], "Lecture 1");
        assert_eq!(json["sources"][1]["content"], "B.");
    }

    #[test]
    fn test_chat_result_orders_messages_and_sources() {
        let result = chat_result(Message::system("sys"), Message::user("usr"), passages());
        assert_eq!(result.messages[0].role, Role::System);
        assert_eq!(result.messages[1].role, Role::User);
        assert_eq!(result.sources, passages());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "usr");
    }

    #[test]
    fn test_answer_display() {
        let answer = Answer {
            answer: "A monad is a monoid in the category of endofunctors.".to_string(),
            sources: passages(),
        };
        let shown = answer.format_for_display();
        assert!(shown.starts_with("A monad"));
        assert!(shown.contains("Lecture 2 (similarity: 0.80)"));
    }
}
