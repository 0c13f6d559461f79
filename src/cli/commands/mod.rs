//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod doctor;
mod search;
mod serve;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use doctor::run_doctor;
pub use search::run_search;
pub use serve::{router, run_serve, AppState};

use crate::cli::QueryArgs;
use crate::config::Settings;
use crate::rag::{Query, QueryRequest};

/// Turn command-line query options into a validated query.
fn build_query(args: &QueryArgs, settings: &Settings) -> crate::Result<Query> {
    QueryRequest {
        prompt: args.prompt.clone(),
        api_key: args.api_key.clone().unwrap_or_default(),
        similarity_threshold: args.threshold,
        results: args.results,
        sentences: args.sentences,
    }
    .into_query(&settings.rag)
}
