//! Chat command: print the assembled instruction as JSON.
//!
//! The output is the same document `POST /chat` returns, so it can be piped
//! straight into a chat-completion client.

use super::build_query;
use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, QueryArgs};
use crate::config::Settings;
use crate::rag::RagEngine;
use anyhow::Result;

/// Run the chat command.
pub async fn run_chat(args: &QueryArgs, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Retrieve, &settings, args.api_key.as_deref()) {
        Output::error(&format!("{}", e));
        Output::info("Run 'course-rag doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let query = build_query(args, &settings)?;
    let engine = RagEngine::from_settings(&settings).await?;

    let result = engine.chat(&query).await.map_err(|e| {
        Output::error(&format!("Chat failed: {}", e));
        e
    })?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
