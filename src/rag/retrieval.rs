//! Retrieval pipeline: embed the question, then search the corpus.

use super::Query;
use crate::embedding::Embedder;
use crate::error::{CourseRagError, ErrorKind, Result};
use crate::vector_store::{Passage, VectorStore};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Turns a query into ranked passages.
///
/// One embedding call followed by one store call; no retries. Failures keep
/// their component's kind: anything the embedder raises is an embedding
/// failure, anything the store raises is a retrieval failure.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
}

impl Retriever {
    /// Create a new retriever.
    pub fn new(embedder: Arc<dyn Embedder>, vector_store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            vector_store,
        }
    }

    /// Retrieve passages for `query`, most similar first.
    #[instrument(
        skip(self, query),
        fields(
            results = query.results,
            threshold = query.similarity_threshold,
            model = self.embedder.model(),
            backend = self.vector_store.backend()
        )
    )]
    pub async fn retrieve(&self, query: &Query) -> Result<Vec<Passage>> {
        query.validate()?;

        info!("Creating embedding");
        let embedding = self
            .embedder
            .embed(&query.prompt, &query.api_key)
            .await
            .map_err(|e| {
                error!("Issue with creating an embedding: {}", e);
                as_kind(e, ErrorKind::Embedding)
            })?;

        info!("Querying vector store");
        let passages = self
            .vector_store
            .search(&embedding, query.similarity_threshold, query.results)
            .await
            .map_err(|e| {
                error!("Issue with querying the vector store: {}", e);
                as_kind(e, ErrorKind::Retrieval)
            })?;

        debug!("Retrieved {} passages", passages.len());
        Ok(passages)
    }
}

/// Re-wrap `err` so callers see `kind`, keeping the original as the source.
fn as_kind(err: CourseRagError, kind: ErrorKind) -> CourseRagError {
    if err.kind() == kind {
        return err;
    }
    let message = err.to_string();
    match kind {
        ErrorKind::Embedding => CourseRagError::embedding(message, err),
        _ => CourseRagError::retrieval(message, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::Sentences;
    use crate::vector_store::{CorpusRecord, MemoryVectorStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds every text to the same vector.
    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str, _api_key: &str) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }

        fn model(&self) -> &str {
            "fixed"
        }
    }

    /// Rejects every credential, like the API does for a bad key.
    struct RejectingEmbedder;

    #[async_trait]
    impl Embedder for RejectingEmbedder {
        async fn embed(&self, _text: &str, _api_key: &str) -> Result<Vec<f32>> {
            Err(CourseRagError::Config("401 Unauthorized: invalid api key".to_string()))
        }

        fn model(&self) -> &str {
            "rejecting"
        }
    }

    /// Counts calls and fails them.
    #[derive(Default)]
    struct CountingStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl VectorStore for CountingStore {
        async fn search(&self, _e: &[f32], _t: f32, _l: usize) -> Result<Vec<Passage>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CourseRagError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )))
        }

        fn backend(&self) -> &'static str {
            "counting"
        }
    }

    fn query(results: usize, threshold: f32) -> Query {
        Query {
            prompt: "What is a monad?".to_string(),
            api_key: "sk-test".to_string(),
            similarity_threshold: threshold,
            results,
            sentences: Sentences::Short,
        }
    }

    /// Unit vector whose cosine similarity with `[1, 0]` is `similarity`.
    fn at_similarity(title: &str, similarity: f32) -> CorpusRecord {
        CorpusRecord {
            title: title.to_string(),
            content: format!("{} content", title),
            embedding: vec![similarity, (1.0 - similarity * similarity).sqrt()],
        }
    }

    fn corpus() -> Arc<MemoryVectorStore> {
        Arc::new(
            MemoryVectorStore::new(
                vec![
                    at_similarity("high", 0.9),
                    at_similarity("middle", 0.8),
                    at_similarity("low", 0.6),
                ],
                2,
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_threshold_and_limit_scenario() {
        let retriever = Retriever::new(Arc::new(FixedEmbedder(vec![1.0, 0.0])), corpus());

        let passages = retriever.retrieve(&query(2, 0.75)).await.unwrap();

        let titles: Vec<_> = passages.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["high", "middle"]);
        assert!((passages[0].similarity - 0.9).abs() < 1e-4);
        assert!((passages[1].similarity - 0.8).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_results_bound_and_order_hold() {
        let retriever = Retriever::new(Arc::new(FixedEmbedder(vec![1.0, 0.0])), corpus());

        for k in 1..=4 {
            for threshold in [0.0, 0.5, 0.7, 0.85, 0.95] {
                let passages = retriever.retrieve(&query(k, threshold)).await.unwrap();
                assert!(passages.len() <= k);
                assert!(passages.iter().all(|p| p.similarity >= threshold));
                assert!(passages.windows(2).all(|w| w[0].similarity >= w[1].similarity));
            }
        }
    }

    #[tokio::test]
    async fn test_no_match_is_empty_not_error() {
        let retriever = Retriever::new(Arc::new(FixedEmbedder(vec![1.0, 0.0])), corpus());
        let passages = retriever.retrieve(&query(3, 0.99)).await.unwrap();
        assert!(passages.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_skips_store() {
        let store = Arc::new(CountingStore::default());
        let retriever = Retriever::new(Arc::new(RejectingEmbedder), store.clone());

        let err = retriever.retrieve(&query(2, 0.75)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Embedding);
        assert!(err.to_string().contains("401"));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_retrieval_failure() {
        let store = Arc::new(CountingStore::default());
        let retriever = Retriever::new(Arc::new(FixedEmbedder(vec![1.0, 0.0])), store.clone());

        let err = retriever.retrieve(&query(2, 0.75)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Retrieval);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_query_makes_no_calls() {
        let store = Arc::new(CountingStore::default());
        let retriever = Retriever::new(Arc::new(FixedEmbedder(vec![1.0, 0.0])), store.clone());

        let err = retriever.retrieve(&query(0, 0.75)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }
}
