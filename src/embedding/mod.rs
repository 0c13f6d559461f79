//! Query embedding for semantic search.

mod openai;

pub use openai::{OpenAIEmbedder, DEFAULT_DIMENSIONS, DEFAULT_MODEL};

use crate::error::Result;
use async_trait::async_trait;

/// Trait for embedding generation.
///
/// Every call hits the backing model; nothing is cached between requests.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text using the caller's credential.
    async fn embed(&self, text: &str, api_key: &str) -> Result<Vec<f32>>;

    /// Name of the embedding model.
    fn model(&self) -> &str;
}
