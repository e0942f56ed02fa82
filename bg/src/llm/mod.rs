//! Graph generation module
//!
//! Asks a locally hosted LLM for a character-relationship diagram of a book.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod ollama;
pub mod prompt;

pub use client::GraphGenerator;
pub use error::GenerateError;
pub use ollama::OllamaClient;
pub use prompt::SYSTEM_PROMPT;

use crate::config::LlmConfig;

/// Create the graph generation client described by config
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn GraphGenerator>, GenerateError> {
    debug!(model = %config.model, base_url = %config.base_url, "create_client: called");
    Ok(Arc::new(OllamaClient::from_config(config)?))
}
