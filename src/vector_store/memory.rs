//! In-memory vector store implementation.
//!
//! Loads a JSON-lines corpus once and scores it in process. Useful for
//! testing and small datasets.

use super::{check_search_args, cosine_similarity, rank, Passage, VectorStore};
use crate::error::{CourseRagError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, info, instrument};

/// One embedded passage of the corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub title: String,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// In-memory vector store.
///
/// Natural order is load order, which breaks similarity ties.
#[derive(Debug)]
pub struct MemoryVectorStore {
    records: Vec<CorpusRecord>,
    dimensions: usize,
}

impl MemoryVectorStore {
    /// Create a store over `records`, all of which must have `dimensions` entries.
    pub fn new(records: Vec<CorpusRecord>, dimensions: usize) -> Result<Self> {
        if let Some((line, record)) = records
            .iter()
            .enumerate()
            .find(|(_, r)| r.embedding.len() != dimensions)
        {
            return Err(CourseRagError::Config(format!(
                "corpus record {} ({:?}) has {} dimensions, expected {}",
                line + 1,
                record.title,
                record.embedding.len(),
                dimensions
            )));
        }

        Ok(Self {
            records,
            dimensions,
        })
    }

    /// Load a corpus with one JSON [`CorpusRecord`] per line. Blank lines are skipped.
    pub fn from_jsonl(path: &Path, dimensions: usize) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let mut records = Vec::new();

        for (index, line) in std::io::BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: CorpusRecord = serde_json::from_str(&line).map_err(|e| {
                CourseRagError::Config(format!("{}:{}: {}", path.display(), index + 1, e))
            })?;
            records.push(record);
        }

        info!("Loaded {} corpus records from {:?}", records.len(), path);
        Self::new(records, dimensions)
    }

    /// Number of records in the corpus.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    #[instrument(skip(self, query_embedding))]
    async fn search(
        &self,
        query_embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<Passage>> {
        check_search_args(threshold, limit)?;
        if query_embedding.len() != self.dimensions {
            return Err(CourseRagError::Retrieval {
                message: format!(
                    "query has {} dimensions, corpus has {}",
                    query_embedding.len(),
                    self.dimensions
                ),
                source: None,
            });
        }

        let candidates = self
            .records
            .iter()
            .map(|record| Passage {
                title: record.title.clone(),
                content: record.content.clone(),
                similarity: cosine_similarity(query_embedding, &record.embedding),
            })
            .collect();

        let results = rank(candidates, threshold, limit);
        debug!("Found {} matching passages", results.len());
        Ok(results)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
