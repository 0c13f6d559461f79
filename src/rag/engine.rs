//! The search and chat operations.

use super::response::{chat_result, search_result};
use super::{Answer, ChatCompleter, ChatResult, PromptAssembler, Query, Retriever, SearchResult};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::Result;
use crate::openai::http_client;
use crate::vector_store::{self, VectorStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Answers queries against the course corpus.
///
/// Holds no per-request state, so one engine is shared by every concurrent
/// request.
pub struct RagEngine {
    retriever: Retriever,
    assembler: PromptAssembler,
}

impl RagEngine {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        prompts: Prompts,
    ) -> Self {
        Self {
            retriever: Retriever::new(embedder, vector_store),
            assembler: PromptAssembler::new(prompts),
        }
    }

    /// Build the engine from configuration.
    ///
    /// Fails on missing or invalid settings and on an unreachable store.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;

        let http = http_client(Duration::from_secs(settings.openai.timeout_secs))?;
        let embedder = OpenAIEmbedder::with_config(
            http,
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        )
        .with_fallback_key(settings.openai.api_key.clone())
        .with_api_base(settings.openai.api_base.clone());

        let store = vector_store::open(settings).await?;
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        info!(
            "RAG engine ready (backend: {}, model: {})",
            store.backend(),
            settings.embedding.model
        );
        Ok(Self::new(Arc::new(embedder), store, prompts))
    }

    /// Retrieve the passages most similar to the query.
    #[instrument(skip(self, query))]
    pub async fn search(&self, query: &Query) -> Result<SearchResult> {
        let passages = self.retriever.retrieve(query).await?;
        Ok(search_result(passages))
    }

    /// Retrieve passages and build the instruction for a chat model.
    ///
    /// No model is called here; the caller sends the messages.
    #[instrument(skip(self, query))]
    pub async fn chat(&self, query: &Query) -> Result<ChatResult> {
        let passages = self.retriever.retrieve(query).await?;
        let (system, user) = self.assembler.assemble(query, &passages);
        Ok(chat_result(system, user, passages))
    }

    /// Run [`RagEngine::chat`] and send the messages to `completer`.
    #[instrument(skip(self, query, completer))]
    pub async fn ask(&self, query: &Query, completer: &dyn ChatCompleter) -> Result<Answer> {
        let chat = self.chat(query).await?;
        info!("Generating answer from {} sources", chat.sources.len());
        let answer = completer.complete(&chat.messages, &query.api_key).await?;
        Ok(Answer {
            answer,
            sources: chat.sources,
        })
    }
}
