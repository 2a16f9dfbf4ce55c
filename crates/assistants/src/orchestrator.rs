//! Generation entry points
//!
//! `GenerationService` owns the shared client handle and poll policy and runs
//! the pipeline: resolve thread → post prompt → launch run → poll → extract.
//! Stateless calls always start a fresh thread; stateful calls resume a thread
//! when given one and hand its identifier back on success and failure alike.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{GenerationError, StatefulGenerationError};
use crate::pipeline;
use crate::poller::{PollPolicy, PollState, RunPoller};
use crate::{AssistantConfig, AssistantError, AssistantsApi, AssistantsApiFactory};

/// Result of a stateful generation
#[derive(Debug, Clone, PartialEq)]
pub struct StatefulReply {
    /// Pass back on the next call to continue the conversation
    pub thread_id: String,
    pub text: String,
}

/// Orchestrates generations against a shared assistants client
#[derive(Clone)]
pub struct GenerationService {
    api: Arc<dyn AssistantsApi>,
    policy: PollPolicy,
}

impl std::fmt::Debug for GenerationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationService")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl GenerationService {
    /// Fails when `policy` allows no status checks
    pub fn new(api: Arc<dyn AssistantsApi>, policy: PollPolicy) -> Result<Self, AssistantError> {
        policy.validate()?;
        Ok(Self { api, policy })
    }

    /// Build the client for the configured provider and wrap it
    pub fn from_config(config: &AssistantConfig) -> Result<Self, AssistantError> {
        let api = AssistantsApiFactory::create(config)?;
        Self::new(api, config.poll)
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Generate a reply on a fresh thread that is not reported back
    pub async fn generate_stateless(
        &self,
        prompt: &str,
        assistant_id: &str,
        cancel: &CancellationToken,
    ) -> Result<String, GenerationError> {
        let thread_id =
            until_cancelled(cancel, pipeline::resolve_thread(self.api.as_ref(), None)).await?;
        self.run_on_thread(&thread_id, prompt, assistant_id, cancel)
            .await
    }

    /// Generate a reply on `thread_id`, or on a new thread when `None`.
    ///
    /// Every failure after the thread was obtained carries its identifier so
    /// the caller can retry or continue the conversation.
    pub async fn generate_stateful(
        &self,
        thread_id: Option<&str>,
        prompt: &str,
        assistant_id: &str,
        cancel: &CancellationToken,
    ) -> Result<StatefulReply, StatefulGenerationError> {
        let resolve = pipeline::resolve_thread(self.api.as_ref(), thread_id);
        let thread_id = until_cancelled(cancel, resolve)
            .await
            .map_err(|error| StatefulGenerationError {
                thread_id: None,
                error,
            })?;

        match self
            .run_on_thread(&thread_id, prompt, assistant_id, cancel)
            .await
        {
            Ok(text) => Ok(StatefulReply { thread_id, text }),
            Err(error) => Err(StatefulGenerationError {
                thread_id: Some(thread_id),
                error,
            }),
        }
    }

    /// Run [`Self::generate_stateless`] on its own task
    pub fn spawn_stateless(
        &self,
        prompt: String,
        assistant_id: String,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<String, GenerationError>> {
        let service = self.clone();
        tokio::spawn(async move {
            service
                .generate_stateless(&prompt, &assistant_id, &cancel)
                .await
        })
    }

    /// Run [`Self::generate_stateful`] on its own task
    pub fn spawn_stateful(
        &self,
        thread_id: Option<String>,
        prompt: String,
        assistant_id: String,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<StatefulReply, StatefulGenerationError>> {
        let service = self.clone();
        tokio::spawn(async move {
            service
                .generate_stateful(thread_id.as_deref(), &prompt, &assistant_id, &cancel)
                .await
        })
    }

    async fn run_on_thread(
        &self,
        thread_id: &str,
        prompt: &str,
        assistant_id: &str,
        cancel: &CancellationToken,
    ) -> Result<String, GenerationError> {
        let api = self.api.as_ref();

        until_cancelled(cancel, pipeline::compose_message(api, thread_id, prompt)).await?;
        let run_id =
            until_cancelled(cancel, pipeline::launch_run(api, thread_id, assistant_id)).await?;

        let report = RunPoller::new(api, self.policy)
            .poll(thread_id, &run_id, cancel)
            .await?;

        match report.state {
            PollState::Succeeded => {
                let text =
                    until_cancelled(cancel, pipeline::extract_response(api, thread_id)).await?;
                tracing::info!(
                    thread_id = %thread_id,
                    run_id = %run_id,
                    attempts = report.attempts,
                    "Generation completed"
                );
                Ok(text)
            }
            PollState::Failed(status) => {
                tracing::error!(run_id = %run_id, status = %status, "Failed run");
                Err(GenerationError::RunFailure { run_id, status })
            }
            PollState::Pending | PollState::TimedOut => Err(GenerationError::PollTimeout {
                attempts: report.attempts,
            }),
        }
    }
}

/// Drive one pipeline step unless `cancel` fires first.
///
/// The step is never started once the token is cancelled, and an in-flight
/// step is dropped on cancellation.
async fn until_cancelled<T>(
    cancel: &CancellationToken,
    step: impl Future<Output = Result<T, GenerationError>>,
) -> Result<T, GenerationError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::info!("Generation cancelled");
            Err(GenerationError::Cancelled)
        }
        result = step => result,
    }
}
