//! Configuration management following 12-factor app principles
//!
//! Process-level settings are loaded from environment variables; service
//! settings (credentials, poll policy) live with the service that uses them.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(anyhow::anyhow!(
                "LOG_FORMAT must be 'pretty' or 'json', got '{}'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Tracing filter directives
    pub rust_log: String,
    pub log_format: LogFormat,

    /// Assistant used when the caller does not name one
    pub default_assistant_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rust_log: "threadline=info".to_string(),
            log_format: LogFormat::Pretty,
            default_assistant_id: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let defaults = Self::default();

        let config = Self {
            rust_log: env::var("RUST_LOG").unwrap_or(defaults.rust_log),
            log_format: match env::var("LOG_FORMAT") {
                Ok(raw) => raw.parse()?,
                Err(_) => defaults.log_format,
            },
            default_assistant_id: env::var("DEFAULT_ASSISTANT_ID")
                .ok()
                .filter(|id| !id.trim().is_empty()),
        };

        Ok(config)
    }
}
