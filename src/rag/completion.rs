//! Chat completion for turning an assembled prompt into an answer.

use super::{Message, Role};
use crate::error::{CourseRagError, Result};
use crate::openai::{client_for_key, resolve_api_key};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Trait for generative chat models. The returned text is not interpreted.
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    async fn complete(&self, messages: &[Message], api_key: &str) -> Result<String>;
}

/// OpenAI chat completion.
pub struct OpenAIChatCompleter {
    http: reqwest::Client,
    model: String,
    temperature: f32,
    fallback_key: Option<String>,
    api_base: Option<String>,
}

impl OpenAIChatCompleter {
    pub fn new(http: reqwest::Client, model: &str, temperature: f32) -> Self {
        Self {
            http,
            model: model.to_string(),
            temperature,
            fallback_key: None,
            api_base: None,
        }
    }

    /// Key used when a request does not carry its own.
    pub fn with_fallback_key(mut self, key: Option<String>) -> Self {
        self.fallback_key = key;
        self
    }

    /// Send requests to `base` instead of the public OpenAI endpoint.
    pub fn with_api_base(mut self, base: Option<String>) -> Self {
        self.api_base = base;
        self
    }
}

fn to_request_message(message: &Message) -> Result<ChatCompletionRequestMessage> {
    let converted: ChatCompletionRequestMessage = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content.clone())
            .build()
            .map_err(|e| CourseRagError::completion("Failed to build system message", e))?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(message.content.clone())
            .build()
            .map_err(|e| CourseRagError::completion("Failed to build user message", e))?
            .into(),
    };
    Ok(converted)
}

#[async_trait]
impl ChatCompleter for OpenAIChatCompleter {
    #[instrument(skip(self, messages, api_key), fields(model = %self.model))]
    async fn complete(&self, messages: &[Message], api_key: &str) -> Result<String> {
        let key = resolve_api_key(api_key, self.fallback_key.as_deref()).ok_or_else(|| {
            CourseRagError::Completion {
                message: "No OpenAI API key supplied".to_string(),
                source: None,
            }
        })?;

        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| CourseRagError::completion("Failed to build request", e))?;

        let response = client_for_key(&self.http, self.api_base.as_deref(), key)
            .chat()
            .create(request)
            .await
            .map_err(|e| CourseRagError::completion("Failed to generate response", e))?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| CourseRagError::Completion {
                message: "Empty response from LLM".to_string(),
                source: None,
            })?
            .clone();

        debug!("Generated answer of {} chars", answer.len());
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_message_conversion() {
        let system = to_request_message(&Message::system("Be concise.")).unwrap();
        assert!(matches!(system, ChatCompletionRequestMessage::System(_)));

        let user = to_request_message(&Message::user("What is a monad?")).unwrap();
        assert!(matches!(user, ChatCompletionRequestMessage::User(_)));
    }

    #[tokio::test]
    async fn test_missing_key_is_completion_failure() {
        let completer = OpenAIChatCompleter::new(reqwest::Client::new(), "gpt-3.5-turbo", 0.2);
        let err = completer
            .complete(&[Message::user("hi")], "")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Completion);
    }

    #[tokio::test]
    async fn test_rate_limit_fails_after_one_request() {
        let (base, hits) = crate::openai::rate_limited::serve().await;
        let completer = OpenAIChatCompleter::new(reqwest::Client::new(), "gpt-3.5-turbo", 0.2)
            .with_api_base(Some(base));

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            completer.complete(&[Message::user("hi")], "sk-test"),
        )
        .await
        .expect("rate-limited completion must not be retried");

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Completion);
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
