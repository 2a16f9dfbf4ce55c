//! Run status classification
//!
//! The remote service reports run status as a string. Only four values are
//! terminal; everything else, including values this crate does not know yet,
//! is treated as still pending.

use serde::{Deserialize, Serialize};

/// Run status as reported by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Incomplete,
    Completed,
    Cancelled,
    Failed,
    Expired,
    /// A status this client does not recognise
    Other(String),
}

/// Classification of a run status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Pending,
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Incomplete => "incomplete",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Expired => "expired",
            Self::Other(raw) => raw.as_str(),
        }
    }

    pub fn phase(&self) -> RunPhase {
        match self {
            Self::Completed => RunPhase::Succeeded,
            Self::Cancelled | Self::Failed | Self::Expired => RunPhase::Failed,
            Self::Queued
            | Self::InProgress
            | Self::RequiresAction
            | Self::Cancelling
            | Self::Incomplete
            | Self::Other(_) => RunPhase::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase() != RunPhase::Pending
    }
}

impl From<String> for RunStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "queued" => Self::Queued,
            "in_progress" => Self::InProgress,
            "requires_action" => Self::RequiresAction,
            "cancelling" => Self::Cancelling,
            "incomplete" => Self::Incomplete,
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            "failed" => Self::Failed,
            "expired" => Self::Expired,
            _ => Self::Other(raw),
        }
    }
}

impl From<&str> for RunStatus {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<RunStatus> for String {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
