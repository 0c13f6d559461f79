//! Retrieval-augmented question answering over the course corpus.
//!
//! A [`Query`] is embedded, matched against the corpus, and either returned
//! as ranked passages ([`RagEngine::search`]) or assembled into a system and
//! user message pair ready for a chat model ([`RagEngine::chat`]).

mod completion;
mod engine;
mod prompt;
mod query;
mod response;
mod retrieval;

pub use completion::{ChatCompleter, OpenAIChatCompleter};
pub use engine::RagEngine;
pub use prompt::{Message, PromptAssembler, Role, UserPromptBuilder};
pub use query::{Query, QueryRequest, Sentences};
pub use response::{chat_result, search_result, Answer, ChatResult, SearchResult};
pub use retrieval::Retriever;
