//! Threadline Assistants Service
//!
//! Drives a remote assistant service through a complete generation job:
//! - Thread lifecycle, message composition and run launch (`pipeline`)
//! - Run status polling under a fixed attempt budget (`poller`)
//! - Stateless and stateful generation entry points (`orchestrator`)
//! - OpenAI Assistants API v2 client for production, programmable mock for tests

pub mod error;
pub mod mock;
pub mod openai;
pub mod orchestrator;
pub mod pipeline;
pub mod poller;
pub mod status;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use error::{GenerationError, SetupStep, StatefulGenerationError};
pub use orchestrator::{GenerationService, StatefulReply};
pub use poller::{PollPolicy, PollReport, PollState, RunPoller};
pub use status::{RunPhase, RunStatus};
pub use tokio_util::sync::CancellationToken;

/// Errors raised by the remote assistant service or its client
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssistantError {
    #[error("Assistants configuration error: {0}")]
    Configuration(String),

    #[error("Assistants request error: {0}")]
    Request(String),

    #[error("Assistants resource not found: {0}")]
    NotFound(String),

    #[error("Assistants rate limit exceeded")]
    RateLimit,

    #[error("Assistants response error: {0}")]
    Response(String),
}

/// A configured assistant on the remote side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

/// A remote conversation thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    #[serde(default)]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// Text payload of a content block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<serde_json::Value>,
}

/// One block of message content. Only text blocks carry a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: TextContent,
    },
    #[serde(other)]
    Other,
}

impl ContentBlock {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            text: TextContent {
                value: value.into(),
                annotations: Vec::new(),
            },
        }
    }

    /// The block's text, if it is a text block
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text.value.as_str()),
            Self::Other => None,
        }
    }
}

/// A message as stored on a remote thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub thread_id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// Body for appending a message to a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub role: MessageRole,
    pub content: String,
}

impl NewMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Error details attached to a failed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLastError {
    pub code: String,
    pub message: String,
}

/// A single execution of an assistant against a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub thread_id: String,
    pub assistant_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunLastError>,
}

/// Capabilities of the remote assistant service.
///
/// Implementations hold transport configuration only and are shared across
/// concurrent generations.
#[async_trait::async_trait]
pub trait AssistantsApi: Send + Sync {
    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant, AssistantError>;

    async fn create_thread(&self) -> Result<Thread, AssistantError>;

    async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread, AssistantError>;

    async fn create_message(
        &self,
        thread_id: &str,
        message: NewMessage,
    ) -> Result<ThreadMessage, AssistantError>;

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, AssistantError>;

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AssistantError>;

    /// List a thread's messages, newest first
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, AssistantError>;
}

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Assistants service configuration
#[derive(Clone)]
pub struct AssistantConfig {
    /// Provider (openai, mock)
    pub provider: String,
    pub api_key: String,
    /// Overrides the default API root
    pub base_url: Option<String>,
    pub organization: Option<String>,
    pub request_timeout: Duration,
    pub poll: PollPolicy,
}

impl std::fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("provider", &self.provider)
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("organization", &self.organization)
            .field("request_timeout", &self.request_timeout)
            .field("poll", &self.poll)
            .finish()
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            api_key: String::new(),
            base_url: None,
            organization: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            poll: PollPolicy::default(),
        }
    }
}

impl AssistantConfig {
    /// Create assistants config from environment variables
    pub fn from_env() -> Result<Self, AssistantError> {
        let provider =
            std::env::var("ASSISTANTS_PROVIDER").unwrap_or_else(|_| "mock".to_string());
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let base_url = std::env::var("OPENAI_BASE_URL").ok();
        let organization = std::env::var("OPENAI_ORGANIZATION").ok();

        let request_timeout = Duration::from_secs(env_parse(
            "ASSISTANTS_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);

        let defaults = PollPolicy::default();
        let poll_interval_ms = env_parse(
            "ASSISTANTS_POLL_INTERVAL_MS",
            defaults.poll_interval.as_millis() as u64,
        )?;
        let max_attempts = env_parse("ASSISTANTS_MAX_ATTEMPTS", defaults.max_attempts)?;

        let config = Self {
            provider,
            api_key,
            base_url,
            organization,
            request_timeout,
            poll: PollPolicy::new(Duration::from_millis(poll_interval_ms), max_attempts),
        };
        config.validate()?;

        Ok(config)
    }

    /// Check the settings that would otherwise fail on the first request
    pub fn validate(&self) -> Result<(), AssistantError> {
        if self.provider == "openai" && self.api_key.is_empty() {
            return Err(AssistantError::Configuration(
                "OPENAI_API_KEY is required for openai provider".to_string(),
            ));
        }
        self.poll.validate().map_err(|_| {
            AssistantError::Configuration("ASSISTANTS_MAX_ATTEMPTS must be at least 1".to_string())
        })
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AssistantError> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            AssistantError::Configuration(format!("{} must be a number, got {:?}", name, raw))
        }),
        Err(_) => Ok(default),
    }
}

/// Factory for creating AssistantsApi implementations
pub struct AssistantsApiFactory;

impl AssistantsApiFactory {
    pub fn create(config: &AssistantConfig) -> Result<Arc<dyn AssistantsApi>, AssistantError> {
        config.validate()?;

        match config.provider.as_str() {
            "openai" => {
                tracing::info!("Creating OpenAI assistants client");
                Ok(Arc::new(openai::OpenAiAssistants::new(config)?))
            }
            "mock" => {
                tracing::info!("Creating mock assistants service");
                Ok(Arc::new(mock::MockAssistantsApi::new()))
            }
            provider => Err(AssistantError::Configuration(format!(
                "Unknown assistants provider: {}. Supported providers: openai, mock",
                provider
            ))),
        }
    }
}
