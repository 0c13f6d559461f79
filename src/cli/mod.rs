//! CLI module for course-rag.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::rag::Sentences;
use clap::{Args, Parser, Subcommand};

/// course-rag - semantic search and retrieval-augmented chat over MIT course content
#[derive(Parser, Debug)]
#[command(name = "course-rag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Query options shared by `search`, `chat` and `ask`.
///
/// Omitted tuning options fall back to the `[rag]` settings.
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// The question to ask
    pub prompt: String,

    /// Maximum number of passages to retrieve
    #[arg(short = 'n', long)]
    pub results: Option<usize>,

    /// Minimum cosine similarity (0.0-1.0)
    #[arg(short = 't', long)]
    pub threshold: Option<f32>,

    /// Answer length: short, medium or long
    #[arg(short, long)]
    pub sentences: Option<Sentences>,

    /// OpenAI API key for this request (defaults to the configured key)
    #[arg(long, env = "COURSE_RAG_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check configuration and connectivity
    Doctor,

    /// Search the course corpus for passages similar to a question
    Search {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Build the chat-model instruction for a question and print it as JSON
    Chat {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Ask a question and get an answer grounded in the course content
    Ask {
        #[command(flatten)]
        query: QueryArgs,

        /// LLM model to use for response generation
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration (credentials masked)
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_with_options() {
        let cli = Cli::try_parse_from([
            "course-rag", "search", "What is a monad?", "-n", "3", "-t", "0.8",
        ])
        .unwrap();
        match cli.command {
            Commands::Search { query } => {
                assert_eq!(query.prompt, "What is a monad?");
                assert_eq!(query.results, Some(3));
                assert_eq!(query.threshold, Some(0.8));
                assert!(query.sentences.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_serve_defaults_to_settings() {
        let cli = Cli::try_parse_from(["course-rag", "-v", "serve"]).unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(
            cli.command,
            Commands::Serve {
                host: None,
                port: None
            }
        ));
    }
}
