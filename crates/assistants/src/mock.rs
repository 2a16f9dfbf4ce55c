//! Mock Assistants Service Implementation
//!
//! In-memory stand-in for the remote assistant service:
//! - `MockAssistantsApi`: keeps threads and runs in memory, records every call
//! - `MockAssistantBehavior`: scripts run statuses, replies and failures
//! - `MockOperation` / `RecordedCall`: call history for test assertions

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::{
    Assistant, AssistantError, AssistantsApi, ContentBlock, MessageRole, NewMessage, Run,
    RunStatus, Thread, ThreadMessage,
};

/// The seven capabilities of the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    RetrieveAssistant,
    CreateThread,
    RetrieveThread,
    CreateMessage,
    CreateRun,
    RetrieveRun,
    ListMessages,
}

/// A recorded call for test assertions
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    RetrieveAssistant { assistant_id: String },
    CreateThread,
    RetrieveThread { thread_id: String },
    CreateMessage { thread_id: String, content: String },
    CreateRun { thread_id: String, assistant_id: String },
    RetrieveRun { thread_id: String, run_id: String },
    ListMessages { thread_id: String },
}

impl RecordedCall {
    pub fn operation(&self) -> MockOperation {
        match self {
            Self::RetrieveAssistant { .. } => MockOperation::RetrieveAssistant,
            Self::CreateThread => MockOperation::CreateThread,
            Self::RetrieveThread { .. } => MockOperation::RetrieveThread,
            Self::CreateMessage { .. } => MockOperation::CreateMessage,
            Self::CreateRun { .. } => MockOperation::CreateRun,
            Self::RetrieveRun { .. } => MockOperation::RetrieveRun,
            Self::ListMessages { .. } => MockOperation::ListMessages,
        }
    }
}

/// Programmable behavior for the mock assistants service
#[derive(Debug, Clone, Default)]
pub struct MockAssistantBehavior {
    /// Statuses returned by successive status checks of a run. The last entry
    /// repeats once the script runs out; an empty script means `completed`.
    pub run_statuses: Arc<RwLock<Vec<RunStatus>>>,
    /// Reply appended when a run completes. Defaults to echoing the prompt.
    pub reply: Arc<RwLock<Option<String>>>,
    /// Returned verbatim by `list_messages` instead of the thread's contents
    pub messages_override: Arc<RwLock<Option<Vec<ThreadMessage>>>>,
    pub failing_operation: Arc<RwLock<Option<MockOperation>>>,
    /// 1-based status check that fails with a request error
    pub status_error_at: Arc<RwLock<Option<u32>>>,
}

impl MockAssistantBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_run_statuses(&self, statuses: Vec<RunStatus>) {
        *self.run_statuses.write().unwrap() = statuses;
    }

    pub fn set_reply(&self, reply: impl Into<String>) {
        *self.reply.write().unwrap() = Some(reply.into());
    }

    pub fn set_messages_override(&self, messages: Vec<ThreadMessage>) {
        *self.messages_override.write().unwrap() = Some(messages);
    }

    pub fn fail_operation(&self, operation: MockOperation) {
        *self.failing_operation.write().unwrap() = Some(operation);
    }

    pub fn fail_status_check_at(&self, attempt: u32) {
        *self.status_error_at.write().unwrap() = Some(attempt);
    }

    /// Reset to default behavior
    pub fn reset(&self) {
        *self.run_statuses.write().unwrap() = Vec::new();
        *self.reply.write().unwrap() = None;
        *self.messages_override.write().unwrap() = None;
        *self.failing_operation.write().unwrap() = None;
        *self.status_error_at.write().unwrap() = None;
    }

    fn fails(&self, operation: MockOperation) -> bool {
        *self.failing_operation.read().unwrap() == Some(operation)
    }

    fn status_for_check(&self, index: usize) -> RunStatus {
        let script = self.run_statuses.read().unwrap();
        script
            .get(index)
            .or_else(|| script.last())
            .cloned()
            .unwrap_or(RunStatus::Completed)
    }
}

#[derive(Debug)]
struct MockRun {
    thread_id: String,
    assistant_id: String,
    checks: usize,
    replied: bool,
}

#[derive(Debug, Default)]
struct MockState {
    /// Messages per thread, oldest first
    threads: HashMap<String, Vec<ThreadMessage>>,
    runs: HashMap<String, MockRun>,
    status_checks: u32,
}

/// Mock assistants service with programmable behavior
#[derive(Debug, Clone)]
pub struct MockAssistantsApi {
    behavior: Arc<MockAssistantBehavior>,
    state: Arc<Mutex<MockState>>,
    history: Arc<Mutex<Vec<RecordedCall>>>,
}

impl Default for MockAssistantsApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAssistantsApi {
    pub fn new() -> Self {
        Self::with_behavior(Arc::new(MockAssistantBehavior::new()))
    }

    pub fn with_behavior(behavior: Arc<MockAssistantBehavior>) -> Self {
        Self {
            behavior,
            state: Arc::new(Mutex::new(MockState::default())),
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn behavior(&self) -> &Arc<MockAssistantBehavior> {
        &self.behavior
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.history
            .lock()
            .expect("history lock poisoned, prior test panicked")
            .clone()
    }

    /// Number of recorded calls of one operation
    pub fn calls_to(&self, operation: MockOperation) -> usize {
        self.recorded_calls()
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    pub fn reset_history(&self) {
        self.history
            .lock()
            .expect("history lock poisoned, prior test panicked")
            .clear();
    }

    /// Messages currently stored on a thread, oldest first
    pub fn thread_messages(&self, thread_id: &str) -> Vec<ThreadMessage> {
        self.state
            .lock()
            .expect("state lock poisoned, prior test panicked")
            .threads
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: RecordedCall) -> Result<(), AssistantError> {
        let operation = call.operation();
        self.history
            .lock()
            .map_err(|e| AssistantError::Request(format!("history lock poisoned: {e}")))?
            .push(call);

        if self.behavior.fails(operation) {
            tracing::debug!(?operation, "Mock assistants: injecting failure");
            return Err(AssistantError::Request(format!(
                "mock failure injected for {:?}",
                operation
            )));
        }
        Ok(())
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, MockState>, AssistantError> {
        self.state
            .lock()
            .map_err(|e| AssistantError::Request(format!("state lock poisoned: {e}")))
    }
}

fn mock_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

#[async_trait::async_trait]
impl AssistantsApi for MockAssistantsApi {
    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant, AssistantError> {
        self.record(RecordedCall::RetrieveAssistant {
            assistant_id: assistant_id.to_string(),
        })?;

        Ok(Assistant {
            id: assistant_id.to_string(),
            name: Some("Mock Assistant".to_string()),
            model: Some("mock-model".to_string()),
            instructions: None,
        })
    }

    async fn create_thread(&self) -> Result<Thread, AssistantError> {
        self.record(RecordedCall::CreateThread)?;

        let id = mock_id("thread");
        self.lock_state()?.threads.insert(id.clone(), Vec::new());
        tracing::debug!(thread_id = %id, "Mock assistants: created thread");

        Ok(Thread {
            id,
            created_at: None,
        })
    }

    async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread, AssistantError> {
        self.record(RecordedCall::RetrieveThread {
            thread_id: thread_id.to_string(),
        })?;

        if !self.lock_state()?.threads.contains_key(thread_id) {
            return Err(AssistantError::NotFound(format!("thread {}", thread_id)));
        }

        Ok(Thread {
            id: thread_id.to_string(),
            created_at: None,
        })
    }

    async fn create_message(
        &self,
        thread_id: &str,
        message: NewMessage,
    ) -> Result<ThreadMessage, AssistantError> {
        self.record(RecordedCall::CreateMessage {
            thread_id: thread_id.to_string(),
            content: message.content.clone(),
        })?;

        let mut state = self.lock_state()?;
        let messages = state
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| AssistantError::NotFound(format!("thread {}", thread_id)))?;

        let stored = ThreadMessage {
            id: mock_id("msg"),
            thread_id: thread_id.to_string(),
            role: message.role,
            content: vec![ContentBlock::text(message.content)],
        };
        messages.push(stored.clone());

        Ok(stored)
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, AssistantError> {
        self.record(RecordedCall::CreateRun {
            thread_id: thread_id.to_string(),
            assistant_id: assistant_id.to_string(),
        })?;

        let mut state = self.lock_state()?;
        if !state.threads.contains_key(thread_id) {
            return Err(AssistantError::NotFound(format!("thread {}", thread_id)));
        }

        let id = mock_id("run");
        state.runs.insert(
            id.clone(),
            MockRun {
                thread_id: thread_id.to_string(),
                assistant_id: assistant_id.to_string(),
                checks: 0,
                replied: false,
            },
        );

        Ok(Run {
            id,
            thread_id: thread_id.to_string(),
            assistant_id: assistant_id.to_string(),
            status: RunStatus::Queued,
            last_error: None,
        })
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AssistantError> {
        self.record(RecordedCall::RetrieveRun {
            thread_id: thread_id.to_string(),
            run_id: run_id.to_string(),
        })?;

        let mut state = self.lock_state()?;
        state.status_checks += 1;
        if *self.behavior.status_error_at.read().unwrap() == Some(state.status_checks) {
            return Err(AssistantError::Request(format!(
                "mock status check {} failed",
                state.status_checks
            )));
        }

        let MockState { threads, runs, .. } = &mut *state;
        let run = runs
            .get_mut(run_id)
            .filter(|run| run.thread_id == thread_id)
            .ok_or_else(|| AssistantError::NotFound(format!("run {}", run_id)))?;

        let status = self.behavior.status_for_check(run.checks);
        run.checks += 1;

        if status == RunStatus::Completed && !run.replied {
            run.replied = true;
            let messages = threads.entry(thread_id.to_string()).or_default();
            let reply = self.behavior.reply.read().unwrap().clone().unwrap_or_else(|| {
                let prompt = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == MessageRole::User)
                    .and_then(|m| m.content.first())
                    .and_then(ContentBlock::as_text)
                    .unwrap_or("empty");
                format!("Mock response to: {}", prompt)
            });
            messages.push(ThreadMessage {
                id: mock_id("msg"),
                thread_id: thread_id.to_string(),
                role: MessageRole::Assistant,
                content: vec![ContentBlock::text(reply)],
            });
        }

        Ok(Run {
            id: run_id.to_string(),
            thread_id: thread_id.to_string(),
            assistant_id: run.assistant_id.clone(),
            status,
            last_error: None,
        })
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, AssistantError> {
        self.record(RecordedCall::ListMessages {
            thread_id: thread_id.to_string(),
        })?;

        if let Some(messages) = self.behavior.messages_override.read().unwrap().clone() {
            return Ok(messages);
        }

        let state = self.lock_state()?;
        let messages = state
            .threads
            .get(thread_id)
            .ok_or_else(|| AssistantError::NotFound(format!("thread {}", thread_id)))?;

        Ok(messages.iter().rev().cloned().collect())
    }
}
