//! OpenAI embeddings implementation.

use super::Embedder;
use crate::error::{CourseRagError, Result};
use crate::openai::{client_for_key, resolve_api_key};
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

/// Model used by the course corpus embeddings.
pub const DEFAULT_MODEL: &str = "text-embedding-ada-002";

/// Output dimension of [`DEFAULT_MODEL`].
pub const DEFAULT_DIMENSIONS: usize = 1536;

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    http: reqwest::Client,
    model: String,
    dimensions: usize,
    fallback_key: Option<String>,
    api_base: Option<String>,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder with custom model and dimensions.
    pub fn with_config(http: reqwest::Client, model: &str, dimensions: usize) -> Self {
        Self {
            http,
            model: model.to_string(),
            dimensions,
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

    fn check_dimensions(&self, embedding: Vec<f32>) -> Result<Vec<f32>> {
        if embedding.len() != self.dimensions {
            return Err(CourseRagError::Embedding {
                message: format!(
                    "Model {} returned {} dimensions, expected {}",
                    self.model,
                    embedding.len(),
                    self.dimensions
                ),
                source: None,
            });
        }
        Ok(embedding)
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text, api_key), fields(model = %self.model, chars = text.len()))]
    async fn embed(&self, text: &str, api_key: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(CourseRagError::Embedding {
                message: "Cannot embed empty text".to_string(),
                source: None,
            });
        }

        let key = resolve_api_key(api_key, self.fallback_key.as_deref()).ok_or_else(|| {
            CourseRagError::Embedding {
                message: "No OpenAI API key supplied".to_string(),
                source: None,
            }
        })?;

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::String(text.to_string()))
            .build()
            .map_err(|e| CourseRagError::embedding("Failed to build request", e))?;

        let response = client_for_key(&self.http, self.api_base.as_deref(), key)
            .embeddings()
            .create(request)
            .await
            .map_err(|e| {
                warn!("Embedding API call failed: {}", e);
                CourseRagError::embedding("Embedding API error", e)
            })?;

        let embedding = response
            .data
            .into_iter()
            .min_by_key(|d| d.index)
            .map(|d| d.embedding)
            .ok_or_else(|| CourseRagError::Embedding {
                message: "Empty embedding response".to_string(),
                source: None,
            })?;

        debug!("Generated embedding with {} dimensions", embedding.len());
        self.check_dimensions(embedding)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn embedder() -> OpenAIEmbedder {
        OpenAIEmbedder::with_config(reqwest::Client::new(), DEFAULT_MODEL, DEFAULT_DIMENSIONS)
    }

    #[test]
    fn test_embedder_creation() {
        let embedder = embedder();
        assert_eq!(embedder.dimensions, 1536);
        assert_eq!(embedder.model(), "text-embedding-ada-002");

        let embedder =
            OpenAIEmbedder::with_config(reqwest::Client::new(), "text-embedding-3-large", 3072);
        assert_eq!(embedder.dimensions, 3072);
    }

    #[test]
    fn test_dimension_mismatch_is_embedding_failure() {
        let err = embedder().check_dimensions(vec![0.0; 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Embedding);
        assert!(embedder().check_dimensions(vec![0.0; 1536]).is_ok());
    }

    #[tokio::test]
    async fn test_empty_text_rejected_without_network() {
        let err = embedder().embed("   ", "sk-test").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Embedding);
    }

    #[tokio::test]
    async fn test_missing_key_rejected_without_network() {
        let err = embedder().embed("What is a monad?", "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Embedding);
        assert!(err.to_string().contains("No OpenAI API key"));
    }

    #[tokio::test]
    async fn test_rate_limit_fails_after_one_request() {
        let (base, hits) = crate::openai::rate_limited::serve().await;
        let embedder = embedder().with_api_base(Some(base));

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            embedder.embed("What is a monad?", "sk-test"),
        )
        .await
        .expect("rate-limited embedding call must not be retried");

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Embedding);
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
