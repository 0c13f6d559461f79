//! Query model shared by the search and chat operations.

use crate::config::RagSettings;
use crate::error::{CourseRagError, Result};
use serde::{Deserialize, Serialize};

/// Requested answer length.
///
/// Parsed case-insensitively; always rendered upper case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum Sentences {
    Short,
    #[default]
    Medium,
    Long,
}

impl Sentences {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentences::Short => "SHORT",
            Sentences::Medium => "MEDIUM",
            Sentences::Long => "LONG",
        }
    }
}

impl std::str::FromStr for Sentences {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "short" => Ok(Sentences::Short),
            "medium" => Ok(Sentences::Medium),
            "long" => Ok(Sentences::Long),
            _ => Err(format!(
                "Unknown answer length: {} (expected SHORT, MEDIUM or LONG)",
                s
            )),
        }
    }
}

impl TryFrom<String> for Sentences {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for Sentences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated retrieval request.
#[derive(Clone, PartialEq)]
pub struct Query {
    /// The user's question.
    pub prompt: String,
    /// Credential for the embedding service.
    pub api_key: String,
    /// Lower bound on cosine similarity, within [0, 1].
    pub similarity_threshold: f32,
    /// Maximum number of passages to return.
    pub results: usize,
    pub sentences: Sentences,
}

impl Query {
    /// Check the query invariants before any external call is made.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(CourseRagError::InvalidInput("prompt is empty".to_string()));
        }
        if self.results == 0 {
            return Err(CourseRagError::InvalidInput(
                "results must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(CourseRagError::InvalidInput(format!(
                "similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("prompt", &self.prompt)
            .field("api_key", &"<redacted>")
            .field("similarity_threshold", &self.similarity_threshold)
            .field("results", &self.results)
            .field("sentences", &self.sentences)
            .finish()
    }
}

/// Wire shape of a query; omitted tuning fields fall back to [`RagSettings`].
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    pub prompt: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub similarity_threshold: Option<f32>,
    #[serde(default)]
    pub results: Option<usize>,
    #[serde(default)]
    pub sentences: Option<Sentences>,
}

impl QueryRequest {
    /// Fill in defaults and validate.
    pub fn into_query(self, defaults: &RagSettings) -> Result<Query> {
        let query = Query {
            prompt: self.prompt,
            api_key: self.api_key,
            similarity_threshold: self
                .similarity_threshold
                .unwrap_or(defaults.default_similarity_threshold),
            results: self.results.unwrap_or(defaults.default_results),
            sentences: self.sentences.unwrap_or(defaults.default_sentences),
        };
        query.validate()?;
        Ok(query)
    }
}
