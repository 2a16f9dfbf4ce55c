//! Generation pipeline steps
//!
//! Each step performs one or two remote calls and classifies failures:
//! thread lifecycle, message composition and run launch fail with
//! `SetupFailure`; reply extraction fails with `NoResponse` or
//! `ResponseFetchFailure`.

use crate::error::{GenerationError, SetupStep};
use crate::{AssistantsApi, MessageRole, NewMessage, ThreadMessage};

/// Resume `thread_id` if given, otherwise create a fresh thread.
///
/// Resuming retrieves the thread to confirm it exists and returns the
/// identifier unchanged.
pub async fn resolve_thread(
    api: &dyn AssistantsApi,
    thread_id: Option<&str>,
) -> Result<String, GenerationError> {
    match thread_id {
        Some(thread_id) => {
            api.retrieve_thread(thread_id).await.map_err(|e| {
                tracing::error!(thread_id = %thread_id, error = %e, "Failed to retrieve thread");
                GenerationError::setup(SetupStep::ResumeThread)(e)
            })?;
            tracing::debug!(thread_id = %thread_id, "Resumed thread");
            Ok(thread_id.to_string())
        }
        None => {
            let thread = api.create_thread().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to create thread");
                GenerationError::setup(SetupStep::CreateThread)(e)
            })?;
            tracing::debug!(thread_id = %thread.id, "Created thread");
            Ok(thread.id)
        }
    }
}

/// Append the prompt to the thread as a user message
pub async fn compose_message(
    api: &dyn AssistantsApi,
    thread_id: &str,
    prompt: &str,
) -> Result<(), GenerationError> {
    api.create_message(thread_id, NewMessage::user(prompt))
        .await
        .map_err(|e| {
            tracing::error!(thread_id = %thread_id, error = %e, "Failed to create message");
            GenerationError::setup(SetupStep::PostMessage)(e)
        })?;
    Ok(())
}

/// Resolve the assistant, then start a run of it on the thread.
/// Returns the run identifier.
pub async fn launch_run(
    api: &dyn AssistantsApi,
    thread_id: &str,
    assistant_id: &str,
) -> Result<String, GenerationError> {
    let assistant = api.retrieve_assistant(assistant_id).await.map_err(|e| {
        tracing::error!(assistant_id = %assistant_id, error = %e, "Failed to retrieve assistant");
        GenerationError::setup(SetupStep::ResolveAssistant)(e)
    })?;

    let run = api
        .create_run(thread_id, &assistant.id)
        .await
        .map_err(|e| {
            tracing::error!(thread_id = %thread_id, error = %e, "Failed to create run");
            GenerationError::setup(SetupStep::LaunchRun)(e)
        })?;

    tracing::info!(
        thread_id = %thread_id,
        assistant_id = %assistant.id,
        run_id = %run.id,
        "Launched run"
    );
    Ok(run.id)
}

/// Text of the newest message, if it is a non-empty assistant text reply.
///
/// `messages` must be ordered newest first. Only the first content block of
/// the first message is inspected.
pub fn reply_text(messages: &[ThreadMessage]) -> Option<&str> {
    let newest = messages.first()?;
    if newest.role != MessageRole::Assistant {
        return None;
    }
    newest
        .content
        .first()?
        .as_text()
        .filter(|text| !text.is_empty())
}

/// Fetch the thread's messages after a completed run and extract the reply
pub async fn extract_response(
    api: &dyn AssistantsApi,
    thread_id: &str,
) -> Result<String, GenerationError> {
    let messages = api.list_messages(thread_id).await.map_err(|e| {
        tracing::error!(thread_id = %thread_id, error = %e, "Failed to list messages");
        GenerationError::ResponseFetchFailure(e)
    })?;

    match reply_text(&messages) {
        Some(text) => Ok(text.to_string()),
        None => {
            tracing::warn!(
                thread_id = %thread_id,
                message_count = messages.len(),
                "Completed run left no usable reply"
            );
            Err(GenerationError::NoResponse)
        }
    }
}
