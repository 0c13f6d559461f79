//! course-rag - semantic search and retrieval-augmented chat over course content
//!
//! Answers questions about MIT course material by embedding the question,
//! finding the most similar passages in a pre-built corpus, and assembling
//! them into an instruction for a chat model.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `embedding` - Question embedding
//! - `vector_store` - Corpus backends (Postgres, SQLite, in-memory)
//! - `rag` - Query model, retrieval, prompt assembly and the engine
//! - `cli` - Command-line interface and HTTP server
//!
//! # Example
//!
//! ```rust,no_run
//! use course_rag::config::Settings;
//! use course_rag::rag::{QueryRequest, RagEngine};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let engine = RagEngine::from_settings(&settings).await?;
//!
//!     let query = QueryRequest {
//!         prompt: "What is a monad?".to_string(),
//!         ..Default::default()
//!     }
//!     .into_query(&settings.rag)?;
//!
//!     for passage in engine.search(&query).await?.sources {
//!         println!("{} ({:.2})", passage.title, passage.similarity);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod rag;
pub mod vector_store;

pub use error::{CourseRagError, ErrorKind, Result};
