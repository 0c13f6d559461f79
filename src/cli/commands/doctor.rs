//! Doctor command - verify configuration and connectivity.

use crate::cli::Output;
use crate::config::{Settings, VectorStoreProvider, ENV_OPENAI_API_KEY};
use crate::vector_store;
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
///
/// Returns an error when any check fails so the exit status reflects it.
pub async fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("course-rag Doctor");
    println!();
    println!("Checking configuration and connectivity...\n");

    let mut checks = Vec::new();

    println!("{}", style("Configuration").bold());
    let file_check = check_config_file(config_path);
    file_check.print();
    checks.push(file_check);

    let settings_check = check_settings(settings);
    settings_check.print();
    let settings_valid = settings_check.status == CheckStatus::Ok;
    checks.push(settings_check);

    println!();

    println!("{}", style("API Configuration").bold());
    let api_check = check_openai_api_key(settings.openai.api_key.as_deref());
    api_check.print();
    checks.push(api_check);

    println!();

    println!("{}", style("Vector Store").bold());
    let store_check = if settings_valid {
        check_vector_store(settings).await
    } else {
        CheckResult::warning(
            "Vector store",
            "skipped",
            "Fix the configuration errors above first",
        )
    };
    store_check.print();
    checks.push(store_check);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using course-rag.",
            errors
        ));
        anyhow::bail!("doctor found {} error(s)", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! course-rag is ready to use.");
    }

    Ok(())
}

/// Check that the settings are complete for the selected backend.
fn check_settings(settings: &Settings) -> CheckResult {
    match settings.validate() {
        Ok(()) => CheckResult::ok(
            "Settings",
            &format!(
                "{} backend, {} ({} dims)",
                settings.vector_store.provider,
                settings.embedding.model,
                settings.embedding.dimensions
            ),
        ),
        Err(e) => CheckResult::error(
            "Settings",
            &e.to_string(),
            "See 'course-rag config show' for the effective values",
        ),
    }
}

/// Check if an OpenAI API key is configured.
///
/// A missing key is only a warning: clients may send their own with each
/// request.
fn check_openai_api_key(key: Option<&str>) -> CheckResult {
    let hint = format!("Set with: export {}='sk-...'", ENV_OPENAI_API_KEY);
    match key.map(str::trim) {
        Some(key) if key.starts_with("sk-") && key.chars().count() > 20 => {
            CheckResult::ok(ENV_OPENAI_API_KEY, &format!("configured ({})", mask_key(key)))
        }
        Some(key) if !key.is_empty() => CheckResult::warning(
            ENV_OPENAI_API_KEY,
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        _ => CheckResult::warning(
            ENV_OPENAI_API_KEY,
            "not set; every request must carry its own key",
            &hint,
        ),
    }
}

/// First seven and last four characters of `key`.
fn mask_key(key: &str) -> String {
    let head: String = key.chars().take(7).collect();
    let mut tail: Vec<char> = key.chars().rev().take(4).collect();
    tail.reverse();
    format!("{}...{}", head, tail.into_iter().collect::<String>())
}

/// Open the configured store.
async fn check_vector_store(settings: &Settings) -> CheckResult {
    let name = match settings.vector_store.provider {
        VectorStoreProvider::Postgres => "Postgres",
        VectorStoreProvider::Sqlite => "SQLite",
        VectorStoreProvider::Memory => "Corpus file",
    };
    match vector_store::open(settings).await {
        Ok(store) => CheckResult::ok(name, &format!("{} store reachable", store.backend())),
        Err(e) => CheckResult::error(
            name,
            &e.to_string(),
            "Check the connection settings under [vector_store]",
        ),
    }
}

/// Check if config file exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults and environment",
            &format!("Create {} to persist settings", config_path.display()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_ok() {
        let result = CheckResult::ok("test", "passed");
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.hint.is_none());
    }

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_api_key_checks() {
        assert_eq!(
            check_openai_api_key(Some("sk-abcdefghijklmnopqrstuvwxyz")).status,
            CheckStatus::Ok
        );
        assert_eq!(check_openai_api_key(Some("key")).status, CheckStatus::Warning);
        assert_eq!(check_openai_api_key(None).status, CheckStatus::Warning);
    }

    #[test]
    fn test_mask_key_handles_multibyte_characters() {
        assert_eq!(mask_key("sk-abcdefghijklmnopqrstuvwxyz"), "sk-abcd...wxyz");

        let result = check_openai_api_key(Some("sk-aéééééééééééééééééé"));
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.message.contains("sk-aééé...éééé"));
    }

    #[test]
    fn test_default_settings_need_database() {
        // Postgres without a URL.
        let mut settings = Settings::default();
        settings.vector_store.postgres.url = None;
        assert_eq!(check_settings(&settings).status, CheckStatus::Error);
    }

    #[tokio::test]
    async fn test_vector_store_check_reports_missing_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.vector_store.provider = VectorStoreProvider::Memory;
        settings.vector_store.corpus_path =
            Some(dir.path().join("missing.jsonl").display().to_string());

        let result = check_vector_store(&settings).await;
        assert_eq!(result.status, CheckStatus::Error);
    }
}
