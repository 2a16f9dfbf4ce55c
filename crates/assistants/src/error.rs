//! Generation error taxonomy

use thiserror::Error;

use crate::{AssistantError, RunStatus};

/// Setup step that failed before polling began
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    CreateThread,
    ResumeThread,
    PostMessage,
    ResolveAssistant,
    LaunchRun,
}

impl std::fmt::Display for SetupStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateThread => write!(f, "create thread"),
            Self::ResumeThread => write!(f, "resume thread"),
            Self::PostMessage => write!(f, "post message"),
            Self::ResolveAssistant => write!(f, "resolve assistant"),
            Self::LaunchRun => write!(f, "launch run"),
        }
    }
}

/// Why a generation produced no text. Exactly one kind per failed call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Generation setup failed at {step}: {source}")]
    SetupFailure {
        step: SetupStep,
        #[source]
        source: AssistantError,
    },

    #[error("Run {run_id} ended with status {status}")]
    RunFailure { run_id: String, status: RunStatus },

    #[error("Run completed without a usable reply")]
    NoResponse,

    #[error("Run still pending after {attempts} status checks")]
    PollTimeout { attempts: u32 },

    #[error("Run status check failed: {0}")]
    TransientPollError(#[source] AssistantError),

    #[error("Failed to fetch run reply: {0}")]
    ResponseFetchFailure(#[source] AssistantError),

    #[error("Generation cancelled")]
    Cancelled,
}

impl GenerationError {
    pub(crate) fn setup(step: SetupStep) -> impl FnOnce(AssistantError) -> Self {
        move |source| Self::SetupFailure { step, source }
    }

    /// Stable code for callers that map failures onto their own responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SetupFailure { .. } => "FAILED_SETUP",
            Self::RunFailure { .. } => "FAILED_RUN",
            Self::NoResponse => "NO_RESPONSE",
            Self::PollTimeout { .. } => "AI_TIMEOUT",
            Self::TransientPollError(_) => "POLL_ERROR",
            Self::ResponseFetchFailure(_) => "RESPONSE_FETCH_ERROR",
            Self::Cancelled => "CANCELLED",
        }
    }
}

/// A stateful generation failure, with the thread id when one was obtained
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error}")]
pub struct StatefulGenerationError {
    /// `None` only when creating or resuming the thread failed
    pub thread_id: Option<String>,
    #[source]
    pub error: GenerationError,
}
