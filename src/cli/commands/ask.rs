//! Ask command implementation.

use super::build_query;
use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, QueryArgs};
use crate::config::Settings;
use crate::openai::http_client;
use crate::rag::{OpenAIChatCompleter, RagEngine};
use anyhow::Result;
use std::time::Duration;

/// Run the ask command.
pub async fn run_ask(args: &QueryArgs, model: Option<String>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Retrieve, &settings, args.api_key.as_deref()) {
        Output::error(&format!("{}", e));
        Output::info("Run 'course-rag doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let query = build_query(args, &settings)?;
    let engine = RagEngine::from_settings(&settings).await?;

    let model = model.unwrap_or_else(|| settings.rag.model.clone());
    let http = http_client(Duration::from_secs(settings.openai.timeout_secs))?;
    let completer = OpenAIChatCompleter::new(http, &model, settings.rag.temperature)
        .with_fallback_key(settings.openai.api_key.clone())
        .with_api_base(settings.openai.api_base.clone());

    let spinner = Output::spinner("Searching course content...");
    let result = engine.ask(&query, &completer).await;
    spinner.finish_and_clear();

    match result {
        Ok(answer) => {
            println!("\n{}\n", answer.answer);

            if !answer.sources.is_empty() {
                Output::header("Sources");
                for (i, source) in answer.sources.iter().enumerate() {
                    Output::passage(i + 1, &source.title, source.similarity, &source.content);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
