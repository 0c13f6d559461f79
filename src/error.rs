//! Error types for course-rag.

use thiserror::Error;

/// Boxed underlying cause kept for diagnostics.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Library-level error type for course-rag operations.
#[derive(Error, Debug)]
pub enum CourseRagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid query: {0}")]
    InvalidInput(String),

    #[error("Embedding generation failed: {message}")]
    Embedding {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Vector store query failed: {message}")]
    Retrieval {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Chat completion failed: {message}")]
    Completion {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Caller-facing failure kinds.
///
/// Collapses boundary errors into the few categories a caller can act on.
/// IO and parse errors only occur while loading configuration, so they
/// report as [`ErrorKind::Configuration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    InvalidInput,
    Embedding,
    Retrieval,
    Completion,
}

impl CourseRagError {
    /// Build an embedding failure wrapping its cause.
    pub fn embedding(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Embedding {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Build a retrieval failure wrapping its cause.
    pub fn retrieval(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Retrieval {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Build a completion failure wrapping its cause.
    pub fn completion(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Completion {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// The failure category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::Io(_) | Self::Json(_) | Self::TomlParse(_) => {
                ErrorKind::Configuration
            }
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Embedding { .. } => ErrorKind::Embedding,
            Self::Retrieval { .. } => ErrorKind::Retrieval,
            Self::Completion { .. } => ErrorKind::Completion,
        }
    }
}

/// Result type alias for course-rag operations.
pub type Result<T> = std::result::Result<T, CourseRagError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_cause_is_chained() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "deadline elapsed");
        let err = CourseRagError::retrieval("search function failed", io);

        assert_eq!(err.kind(), ErrorKind::Retrieval);
        assert_eq!(err.to_string(), "Vector store query failed: search function failed");
        let source = err.source().expect("cause should be preserved");
        assert_eq!(source.to_string(), "deadline elapsed");
    }

    #[test]
    fn test_config_loading_errors_are_configuration_kind() {
        let err: CourseRagError = toml::from_str::<toml::Value>("= broken").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
