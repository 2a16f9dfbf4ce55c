//! Run poller
//!
//! Waits out a fixed interval, checks the run status, and repeats until the
//! run is terminal or the attempt budget is spent:
//!
//! ```text
//! Pending --completed--------------------> Succeeded
//! Pending --cancelled|failed|expired-----> Failed
//! Pending --budget exhausted-------------> TimedOut
//! Pending --anything else----------------> Pending
//! ```
//!
//! A failed status check aborts the loop with `TransientPollError`; it does
//! not consume the remaining budget.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::GenerationError;
use crate::{AssistantError, AssistantsApi, RunPhase, RunStatus};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Timing of the status checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait before every status check, including the first
    pub poll_interval: Duration,
    /// Ceiling on status checks before declaring a timeout
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PollPolicy {
    pub fn new(poll_interval: Duration, max_attempts: u32) -> Self {
        Self {
            poll_interval,
            max_attempts,
        }
    }

    /// A zero budget would launch a run and never look at it
    pub fn validate(&self) -> Result<(), AssistantError> {
        if self.max_attempts == 0 {
            return Err(AssistantError::Configuration(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    Pending,
    Succeeded,
    /// Carries the terminal failure status
    Failed(RunStatus),
    TimedOut,
}

impl PollState {
    pub fn from_status(status: &RunStatus) -> Self {
        match status.phase() {
            RunPhase::Pending => Self::Pending,
            RunPhase::Succeeded => Self::Succeeded,
            RunPhase::Failed => Self::Failed(status.clone()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Terminal state of a poll loop and the number of status checks it took
#[derive(Debug, Clone, PartialEq)]
pub struct PollReport {
    pub state: PollState,
    pub attempts: u32,
}

pub struct RunPoller<'a> {
    api: &'a dyn AssistantsApi,
    policy: PollPolicy,
}

impl<'a> RunPoller<'a> {
    pub fn new(api: &'a dyn AssistantsApi, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    /// Poll one run until it leaves `Pending` or the budget runs out.
    ///
    /// Returns `Err` only for a failed status check or cancellation; run
    /// outcomes, including timeout, are reported through [`PollReport`].
    pub async fn poll(
        &self,
        thread_id: &str,
        run_id: &str,
        cancel: &CancellationToken,
    ) -> Result<PollReport, GenerationError> {
        let mut attempts = 0;

        while attempts < self.policy.max_attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(run_id = %run_id, attempts, "Run polling cancelled");
                    return Err(GenerationError::Cancelled);
                }
                _ = tokio::time::sleep(self.policy.poll_interval) => {}
            }

            attempts += 1;

            let run = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(run_id = %run_id, attempts, "Run polling cancelled");
                    return Err(GenerationError::Cancelled);
                }
                result = self.api.retrieve_run(thread_id, run_id) => result.map_err(|e| {
                    tracing::warn!(run_id = %run_id, attempt = attempts, error = %e, "Run status check failed");
                    GenerationError::TransientPollError(e)
                })?,
            };

            tracing::debug!(
                run_id = %run_id,
                attempt = attempts,
                status = %run.status,
                "Polled run status"
            );

            let state = PollState::from_status(&run.status);
            if state.is_terminal() {
                return Ok(PollReport { state, attempts });
            }
        }

        tracing::warn!(
            run_id = %run_id,
            attempts,
            "Run still pending after attempt budget"
        );
        Ok(PollReport {
            state: PollState::TimedOut,
            attempts,
        })
    }
}
