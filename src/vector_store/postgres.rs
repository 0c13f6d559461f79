//! Postgres (pgvector) vector store.
//!
//! The corpus lives behind a search function with the signature
//! `fn(query_embedding vector, match_threshold float, match_count int)`
//! returning rows with title, content and similarity columns. Which columns
//! hold those values is configured through [`FieldMapping`].

use super::{check_search_args, rank, Passage, VectorStore};
use crate::config::{validate_identifier, FieldMapping, PostgresSettings};
use crate::error::{CourseRagError, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Postgres-backed vector store.
///
/// Natural order is the order in which the search function returns rows.
pub struct PostgresVectorStore {
    pool: PgPool,
    function: String,
    sql: String,
    fields: FieldMapping,
    query_timeout: Duration,
}

impl PostgresVectorStore {
    /// Connect a pool using `settings`.
    pub async fn connect(settings: &PostgresSettings, fields: &FieldMapping) -> Result<Self> {
        let url = settings
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| CourseRagError::Config("Postgres URL is not set".to_string()))?;
        let function = settings
            .search_function
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| CourseRagError::Config("Postgres search function is not set".to_string()))?;
        validate_identifier(function, "search function")?;
        validate_identifier(&fields.title, "title field")?;
        validate_identifier(&fields.content, "content field")?;
        validate_identifier(&fields.similarity, "similarity field")?;

        let query_timeout = Duration::from_secs(settings.query_timeout_secs.max(1));
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections.max(1))
            .acquire_timeout(query_timeout)
            .connect(url)
            .await
            .map_err(|e| CourseRagError::retrieval("Failed to connect to Postgres", e))?;

        info!(
            "Connected to Postgres (search function {}, up to {} connections)",
            function, settings.max_connections
        );

        Ok(Self {
            pool,
            function: function.to_string(),
            sql: search_sql(function),
            fields: fields.clone(),
            query_timeout,
        })
    }

    fn decode(&self, row: &PgRow) -> Result<Passage> {
        let title: String = row
            .try_get(self.fields.title.as_str())
            .map_err(|e| CourseRagError::retrieval(format!("Bad {} column", self.fields.title), e))?;
        let content: String = row
            .try_get(self.fields.content.as_str())
            .map_err(|e| CourseRagError::retrieval(format!("Bad {} column", self.fields.content), e))?;

        let column = self.fields.similarity.as_str();
        let similarity = match row.try_get::<f64, _>(column) {
            Ok(value) => value as f32,
            Err(_) => row
                .try_get::<f32, _>(column)
                .map_err(|e| CourseRagError::retrieval(format!("Bad {} column", column), e))?,
        };

        Ok(Passage {
            title,
            content,
            similarity,
        })
    }
}

/// SQL calling the search function; the function name is a validated identifier.
fn search_sql(function: &str) -> String {
    format!("SELECT * FROM {}($1::vector, $2::float8, $3::int4)", function)
}

/// Text form of an embedding accepted by pgvector's `vector` input.
fn vector_literal(embedding: &[f32]) -> String {
    let values: Vec<String> = embedding.iter().map(|v| v.to_string()).collect();
    format!("[{}]", values.join(","))
}

#[async_trait]
impl VectorStore for PostgresVectorStore {
    #[instrument(skip(self, query_embedding), fields(function = %self.function))]
    async fn search(
        &self,
        query_embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<Passage>> {
        check_search_args(threshold, limit)?;
        let count = i32::try_from(limit).map_err(|_| {
            CourseRagError::InvalidInput(format!("result limit {} is too large", limit))
        })?;

        let query = sqlx::query(&self.sql)
            .bind(vector_literal(query_embedding))
            .bind(threshold as f64)
            .bind(count);

        let rows = tokio::time::timeout(self.query_timeout, query.fetch_all(&self.pool))
            .await
            .map_err(|e| {
                warn!("Search function {} timed out", self.function);
                CourseRagError::retrieval("Search function timed out", e)
            })?
            .map_err(|e| {
                warn!("Search function {} failed: {}", self.function, e);
                CourseRagError::retrieval(format!("Search function {} failed", self.function), e)
            })?;

        let candidates = rows
            .iter()
            .map(|row| self.decode(row))
            .collect::<Result<Vec<_>>>()?;

        let results = rank(candidates, threshold, limit);
        debug!("Search function returned {} rows, kept {}", rows.len(), results.len());
        Ok(results)
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
