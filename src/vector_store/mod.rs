//! Vector store abstraction for course-rag.
//!
//! Provides a trait-based interface over the corpus of embedded course
//! passages. Every backend is read-only: the corpus is built and maintained
//! elsewhere.
//!
//! Similarity is cosine similarity (`1 - cosine distance`), so a threshold is
//! a lower bound and higher scores are better.

mod memory;
mod postgres;
mod sqlite;

pub use memory::{CorpusRecord, MemoryVectorStore};
pub use postgres::PostgresVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::config::{Settings, VectorStoreProvider};
use crate::error::{CourseRagError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// A retrieved unit of course content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub title: String,
    pub content: String,
    /// Cosine similarity to the query (higher is better).
    pub similarity: f32,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return at most `limit` passages with similarity >= `threshold`,
    /// most similar first.
    ///
    /// Equal scores keep the store's natural order.
    async fn search(
        &self,
        query_embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<Passage>>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Open the backend selected in `settings`.
pub async fn open(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    let store = &settings.vector_store;
    let dimensions = settings.embedding.dimensions as usize;

    let backend: Arc<dyn VectorStore> = match store.provider {
        VectorStoreProvider::Postgres => {
            Arc::new(PostgresVectorStore::connect(&store.postgres, &store.fields).await?)
        }
        VectorStoreProvider::Sqlite => Arc::new(SqliteVectorStore::open(
            &settings.sqlite_path(),
            &store.sqlite_table,
            &store.fields,
            dimensions,
        )?),
        VectorStoreProvider::Memory => {
            let path = store.corpus_path.as_deref().ok_or_else(|| {
                CourseRagError::Config("vector_store.corpus_path is not set".to_string())
            })?;
            Arc::new(MemoryVectorStore::from_jsonl(
                &Settings::expand_path(path),
                dimensions,
            )?)
        }
    };

    Ok(backend)
}

/// Validate search arguments shared by every backend.
pub(crate) fn check_search_args(threshold: f32, limit: usize) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(CourseRagError::InvalidInput(format!(
            "similarity threshold must be within [0, 1], got {}",
            threshold
        )));
    }
    if limit == 0 {
        return Err(CourseRagError::InvalidInput(
            "result limit must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Apply threshold, ordering and limit to scored candidates.
///
/// Candidates must arrive in the store's natural order; the sort is stable
/// so ties keep it.
pub(crate) fn rank(mut candidates: Vec<Passage>, threshold: f32, limit: usize) -> Vec<Passage> {
    candidates.retain(|p| p.similarity >= threshold);
    candidates.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(Ordering::Equal));
    candidates.truncate(limit);
    candidates
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
