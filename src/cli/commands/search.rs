//! Search command implementation.

use super::build_query;
use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, QueryArgs};
use crate::config::Settings;
use crate::rag::RagEngine;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(args: &QueryArgs, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Retrieve, &settings, args.api_key.as_deref()) {
        Output::error(&format!("{}", e));
        Output::info("Run 'course-rag doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let query = build_query(args, &settings)?;
    let engine = RagEngine::from_settings(&settings).await?;

    let spinner = Output::spinner("Searching course content...");
    let result = engine.search(&query).await;
    spinner.finish_and_clear();

    match result {
        Ok(result) if result.sources.is_empty() => {
            Output::warning("No passages found above the similarity threshold.");
        }
        Ok(result) => {
            Output::success(&format!("Found {} passages", result.sources.len()));
            for (i, passage) in result.sources.iter().enumerate() {
                Output::passage(i + 1, &passage.title, passage.similarity, &passage.content);
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
