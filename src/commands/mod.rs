pub mod discover;
pub mod post;
pub mod status;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use repocast::config::Config;
use repocast::llm::{AnthropicClient, LlmClient};

// Re-export command functions for convenience
pub use discover::discover;
pub use post::post_one;
pub use status::status;

/// Load configuration from a file when given, otherwise from the environment
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Oracle client shared by the classifier and the content generator
fn llm_client(config: &Config) -> Result<Arc<dyn LlmClient>> {
    let client = AnthropicClient::from_config(&config.llm, config.request_timeout())
        .context("LLM client unavailable (set ANTHROPIC_API_KEY)")?;
    Ok(Arc::new(client))
}
