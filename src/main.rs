//! course-rag CLI entry point.

use anyhow::Result;
use clap::Parser;
use course_rag::cli::{commands, Cli, Commands};
use course_rag::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.as_ref().map(PathBuf::from);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging. The server logs at the configured level; other
    // commands stay quiet unless -v is given.
    let log_level = match (cli.verbose, &cli.command) {
        (0, Commands::Serve { .. }) => settings.general.log_level.clone(),
        (0, _) => "warn".to_string(),
        (1, _) => "debug".to_string(),
        _ => "trace".to_string(),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| {
            format!("course_rag={},tower_http={}", log_level, log_level)
        })))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match &cli.command {
        Commands::Doctor => {
            let path = config_path.unwrap_or_else(Settings::default_config_path);
            commands::run_doctor(&settings, &path).await?;
        }

        Commands::Search { query } => {
            commands::run_search(query, settings).await?;
        }

        Commands::Chat { query } => {
            commands::run_chat(query, settings).await?;
        }

        Commands::Ask { query, model } => {
            commands::run_ask(query, model.clone(), settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host.clone(), *port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, config_path)?;
        }
    }

    Ok(())
}
