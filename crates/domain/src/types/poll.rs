//! Status polling vocabulary
//!
//! A status query returns a remote code (integer or string). A [`StatusTable`]
//! maps codes to [`TaskState`]; codes the table does not know are treated as
//! still pending.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;

/// Remote status code, numeric or textual
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusCode {
    Int(i64),
    Text(String),
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(code) => write!(f, "{code}"),
            Self::Text(code) => f.write_str(code),
        }
    }
}

impl From<i64> for StatusCode {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for StatusCode {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for StatusCode {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Terminal classification a status table assigns to a code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Succeeded,
    Failed,
}

impl_domain_status_conversions!(TaskState {
    Pending => "pending",
    Succeeded => "succeeded",
    Failed => "failed",
});

/// Result of inspecting one status response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Pending,
    Succeeded,
    /// Failed with the remote status code as cause
    Failed(StatusCode),
}

/// Status code and trace id read from a status query response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub code: StatusCode,
    pub request_id: Option<String>,
}

impl StatusReport {
    pub fn new(code: impl Into<StatusCode>) -> Self {
        Self { code: code.into(), request_id: None }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// Caller-supplied mapping from status codes to task states
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusTable {
    states: HashMap<StatusCode, TaskState>,
}

impl StatusTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `code` to `state`
    pub fn with(mut self, code: impl Into<StatusCode>, state: TaskState) -> Self {
        self.states.insert(code.into(), state);
        self
    }

    /// Flow-status convention: `0` succeeded, `1` failed, `2` running
    pub fn flow_default() -> Self {
        Self::new()
            .with(0_i64, TaskState::Succeeded)
            .with(1_i64, TaskState::Failed)
            .with(2_i64, TaskState::Pending)
    }

    /// State mapped for `code`, if any
    pub fn state(&self, code: &StatusCode) -> Option<TaskState> {
        self.states.get(code).copied()
    }

    /// Outcome for `code`; unmapped codes keep polling
    pub fn outcome(&self, code: &StatusCode) -> PollOutcome {
        match self.state(code).unwrap_or(TaskState::Pending) {
            TaskState::Pending => PollOutcome::Pending,
            TaskState::Succeeded => PollOutcome::Succeeded,
            TaskState::Failed => PollOutcome::Failed(code.clone()),
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
