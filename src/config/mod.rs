//! Configuration module for course-rag.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{ChatPrompts, Prompts, DEFAULT_FALLBACK};
pub use settings::{
    validate_identifier, EmbeddingSettings, FieldMapping, GeneralSettings, OpenAISettings,
    PostgresSettings, PromptSettings, RagSettings, ServerSettings, Settings, VectorStoreProvider,
    VectorStoreSettings, ENV_DATABASE_URL, ENV_OPENAI_API_KEY, ENV_SEARCH_FUNCTION,
};
