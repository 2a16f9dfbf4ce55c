//! Threadline application composition root
//!
//! Loads configuration and wires the assistants client into a
//! `GenerationService` shared by every caller.

use threadline_assistants::{AssistantConfig, GenerationService};
use threadline_common::Config;

/// Everything a caller needs to run generations
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Config,
    pub generation: GenerationService,
}

impl AppContext {
    /// Build the context from environment variables
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = Config::from_env()?;
        let assistant_config = AssistantConfig::from_env()?;
        Self::new(config, &assistant_config)
    }

    pub fn new(config: Config, assistant_config: &AssistantConfig) -> Result<Self, anyhow::Error> {
        tracing::info!(
            provider = %assistant_config.provider,
            poll_interval_ms = assistant_config.poll.poll_interval.as_millis() as u64,
            max_attempts = assistant_config.poll.max_attempts,
            "Creating generation service"
        );
        let generation = GenerationService::from_config(assistant_config)?;

        Ok(Self { config, generation })
    }

    /// The caller's assistant, falling back to `DEFAULT_ASSISTANT_ID`
    pub fn assistant_id(&self, requested: Option<String>) -> Result<String, anyhow::Error> {
        requested
            .or_else(|| self.config.default_assistant_id.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("No assistant given and DEFAULT_ASSISTANT_ID is not set")
            })
    }
}
