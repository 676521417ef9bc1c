use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::NULL_HANDLE;

/// Opaque token referencing a remote long-running task (flow id, task id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AsyncHandle(String);

impl AsyncHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Empty or `"0"`: the submission has no task left to converge
    pub fn is_null(&self) -> bool {
        self.0.is_empty() || self.0 == NULL_HANDLE
    }
}

impl fmt::Display for AsyncHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for AsyncHandle {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for AsyncHandle {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AsyncHandle {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Order or deal reference that must be resolved to the real resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderRef(String);

impl OrderRef {
    pub fn new(order: impl Into<String>) -> Self {
        Self(order.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a submitting call returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Finished synchronously
    Completed { resource_id: Option<String> },
    /// A task to poll, optionally with the id of the resource it produces
    Task { handle: AsyncHandle, resource_id: Option<String> },
    /// An order/deal that first has to be resolved
    Order(OrderRef),
}

impl Submission {
    pub fn completed(resource_id: impl Into<String>) -> Self {
        Self::Completed { resource_id: Some(resource_id.into()) }
    }

    pub fn task(handle: impl Into<AsyncHandle>) -> Self {
        Self::Task { handle: handle.into(), resource_id: None }
    }

    pub fn task_for(handle: impl Into<AsyncHandle>, resource_id: impl Into<String>) -> Self {
        Self::Task { handle: handle.into(), resource_id: Some(resource_id.into()) }
    }

    pub fn order(order: impl Into<String>) -> Self {
        Self::Order(OrderRef::new(order))
    }
}

/// One entry of an order lookup response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderResolution {
    /// Resources created by the order; exactly one is expected
    pub resource_ids: Vec<String>,
    /// Provisioning task, when the order exposes one
    pub handle: Option<AsyncHandle>,
}

/// What a call site wants when the remote side reports "not found"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundPolicy {
    /// Absence is a valid outcome (delete-if-absent, existence checks)
    Absent,
    /// Absence is an error
    #[default]
    Fatal,
}

impl NotFoundPolicy {
    pub const fn tolerates_absence(self) -> bool {
        matches!(self, Self::Absent)
    }
}
