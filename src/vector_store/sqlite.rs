//! SQLite-based vector store implementation.
//!
//! Reads a corpus table whose embeddings are stored as little-endian f32
//! blobs and computes cosine similarity in Rust. Fine for course-sized
//! corpora; larger deployments should use the Postgres backend.

use super::{check_search_args, cosine_similarity, rank, Passage, VectorStore};
use crate::config::{validate_identifier, FieldMapping};
use crate::error::{CourseRagError, Result};
use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

/// SQLite-based vector store.
///
/// Natural order is `rowid`, which breaks similarity ties.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    table: String,
    fields: FieldMapping,
    select_sql: String,
    dimensions: usize,
}

impl SqliteVectorStore {
    /// Open an existing corpus database read-only.
    #[instrument(skip_all)]
    pub fn open(path: &Path, table: &str, fields: &FieldMapping, dimensions: usize) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| CourseRagError::retrieval(format!("Failed to open {:?}", path), e))?;

        info!("Opened SQLite corpus at {:?}", path);
        Self::with_connection(conn, table, fields, dimensions)
    }

    /// Create an empty in-memory corpus (useful for testing).
    pub fn in_memory(table: &str, fields: &FieldMapping, dimensions: usize) -> Result<Self> {
        validate_layout(table, fields)?;
        let conn = Connection::open_in_memory()
            .map_err(|e| CourseRagError::retrieval("Failed to open in-memory database", e))?;

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                {title} TEXT NOT NULL,
                {content} TEXT NOT NULL,
                {embedding} BLOB NOT NULL
            );",
            table = table,
            title = fields.title,
            content = fields.content,
            embedding = fields.embedding,
        ))
        .map_err(|e| CourseRagError::retrieval("Failed to create corpus table", e))?;

        Self::with_connection(conn, table, fields, dimensions)
    }

    fn with_connection(
        conn: Connection,
        table: &str,
        fields: &FieldMapping,
        dimensions: usize,
    ) -> Result<Self> {
        validate_layout(table, fields)?;

        let select_sql = format!(
            "SELECT {}, {}, {} FROM {} ORDER BY rowid",
            fields.title, fields.content, fields.embedding, table
        );

        Ok(Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
            fields: fields.clone(),
            select_sql,
            dimensions,
        })
    }

    /// Append a passage to the corpus. Only possible on a writable connection.
    #[cfg(test)]
    pub(crate) fn insert(&self, title: &str, content: &str, embedding: &[f32]) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}) VALUES (?1, ?2, ?3)",
                self.table, self.fields.title, self.fields.content, self.fields.embedding
            ),
            rusqlite::params![title, content, Self::embedding_to_bytes(embedding)],
        )
        .map_err(|e| CourseRagError::retrieval("Failed to insert passage", e))?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| CourseRagError::Retrieval {
            message: format!("Failed to acquire lock: {}", e),
            source: None,
        })
    }

    /// Serialize embedding to bytes.
    #[cfg(test)]
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }
}

/// Table and column names are interpolated into SQL, so check them first.
fn validate_layout(table: &str, fields: &FieldMapping) -> Result<()> {
    validate_identifier(table, "table")?;
    validate_identifier(&fields.title, "title field")?;
    validate_identifier(&fields.content, "content field")?;
    validate_identifier(&fields.embedding, "embedding field")
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
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

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&self.select_sql)
            .map_err(|e| CourseRagError::retrieval("Failed to prepare corpus query", e))?;

        let rows = stmt
            .query_map([], |row| {
                let embedding_bytes: Vec<u8> = row.get(2)?;
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    Self::bytes_to_embedding(&embedding_bytes),
                ))
            })
            .map_err(|e| CourseRagError::retrieval("Corpus query failed", e))?;

        let mut candidates = Vec::new();
        for row in rows {
            let (title, content, embedding) =
                row.map_err(|e| CourseRagError::retrieval("Failed to decode corpus row", e))?;
            if embedding.len() != self.dimensions {
                return Err(CourseRagError::Retrieval {
                    message: format!(
                        "stored embedding for {:?} has {} dimensions, expected {}",
                        title,
                        embedding.len(),
                        self.dimensions
                    ),
                    source: None,
                });
            }
            let similarity = cosine_similarity(query_embedding, &embedding);
            candidates.push(Passage {
                title,
                content,
                similarity,
            });
        }

        let results = rank(candidates, threshold, limit);
        debug!("Found {} matching passages", results.len());
        Ok(results)
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;
    use crate::error::ErrorKind;

    fn page_fields() -> FieldMapping {
        FieldMapping {
            title: "page_title".to_string(),
            ..FieldMapping::default()
        }
    }

    #[tokio::test]
    async fn test_sqlite_vector_store() {
        let store = SqliteVectorStore::in_memory("page_sections", &page_fields(), 3).unwrap();
        store.insert("Lecture 1", "Groups.", &[1.0, 0.0, 0.0]).unwrap();
        store.insert("Lecture 2", "Rings.", &[0.0, 1.0, 0.0]).unwrap();

        let results = store.search(&[1.0, 0.0, 0.0], 0.5, 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Lecture 1");
        assert_eq!(results[0].content, "Groups.");
        assert!((results[0].similarity - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_ties_follow_rowid() {
        let store = SqliteVectorStore::in_memory("passages", &FieldMapping::default(), 2).unwrap();
        store.insert("second inserted later", "x", &[2.0, 0.0]).unwrap();
        store.insert("same direction", "y", &[1.0, 0.0]).unwrap();

        let results = store.search(&[1.0, 0.0], 0.0, 2).await.unwrap();
        assert_eq!(results[0].title, "second inserted later");
        assert_eq!(results[1].title, "same direction");
    }

    #[tokio::test]
    async fn test_open_existing_file_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE passages (content_title TEXT, content TEXT, embedding BLOB);",
            )
            .unwrap();
            conn.execute(
                "INSERT INTO passages VALUES (?1, ?2, ?3)",
                params![
                    "Quadratic reciprocity",
                    "For odd primes p and q...",
                    SqliteVectorStore::embedding_to_bytes(&[0.0, 1.0])
                ],
            )
            .unwrap();
        }

        let store = SqliteVectorStore::open(&path, "passages", &FieldMapping::default(), 2).unwrap();
        let results = store.search(&[0.0, 1.0], 0.9, 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Quadratic reciprocity");
    }

    #[tokio::test]
    async fn test_missing_table_is_retrieval_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE unrelated (x INTEGER);")
            .unwrap();

        let store = SqliteVectorStore::open(&path, "passages", &FieldMapping::default(), 2).unwrap();
        let err = store.search(&[0.0, 1.0], 0.5, 5).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Retrieval);
    }

    #[test]
    fn test_embedding_bytes_round_trip() {
        let embedding = vec![0.25, -1.5, 3.0];
        let bytes = SqliteVectorStore::embedding_to_bytes(&embedding);
        assert_eq!(bytes.len(), 12);
        assert_eq!(SqliteVectorStore::bytes_to_embedding(&bytes), embedding);
    }
}
