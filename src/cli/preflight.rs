//! Pre-flight checks before operations that call external services.
//!
//! Catches missing credentials and configuration before the first network
//! call instead of halfway through a request.

use crate::config::{Settings, ENV_OPENAI_API_KEY};
use crate::error::{CourseRagError, Result};
use crate::openai::resolve_api_key;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Search and chat need the store configured and some API key.
    Retrieve,
    /// Serving needs the store configured; keys may arrive per request.
    Serve,
}

/// Run pre-flight checks for the given operation.
///
/// `request_key` is the key supplied on the command line, if any.
pub fn check(operation: Operation, settings: &Settings, request_key: Option<&str>) -> Result<()> {
    settings.validate()?;
    match operation {
        Operation::Retrieve => check_api_key(settings, request_key),
        Operation::Serve => Ok(()),
    }
}

/// Check that a request key or the configured key is available.
fn check_api_key(settings: &Settings, request_key: Option<&str>) -> Result<()> {
    match resolve_api_key(request_key.unwrap_or_default(), settings.openai.api_key.as_deref()) {
        Some(_) => Ok(()),
        None => Err(CourseRagError::Config(format!(
            "No OpenAI API key. Pass --api-key or set it with: export {}='sk-...'",
            ENV_OPENAI_API_KEY
        ))),
    }
}
