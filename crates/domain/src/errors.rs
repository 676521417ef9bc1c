//! Error types surfaced by the convergence engine

use std::time::Duration;

use convergent_common::error::ErrorClass;
use thiserror::Error;

use crate::types::{RemoteError, StatusCode};

/// Main error type for convergent operations
///
/// Every variant produced by a remote call names the action it came from.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvergeError {
    /// Non-retryable remote failure, original cause preserved
    #[error("{action} failed: {source}")]
    Fatal { action: String, source: RemoteError },

    /// The addressed resource does not exist and the caller did not accept
    /// absence
    #[error("{action}: resource not found{}", fmt_request_id(.request_id))]
    NotFound { action: String, request_id: Option<String> },

    /// The asynchronous task reached a failed terminal status
    #[error("{action}: task failed with status {status}{}", fmt_request_id(.request_id))]
    TaskFailed { action: String, status: StatusCode, request_id: Option<String> },

    /// Deadline exceeded while only transient conditions were observed
    #[error(
        "{action}: timed out after {elapsed:?} ({attempts} attempts), last condition: {}",
        .last_condition.as_deref().unwrap_or("none")
    )]
    Timeout { action: String, elapsed: Duration, attempts: u32, last_condition: Option<String> },

    /// Composite identifier with the wrong shape
    #[error("malformed identifier '{id}': {reason}")]
    MalformedIdentifier { id: String, reason: String },

    /// The remote side broke its response contract
    #[error("{action}: contract violation: {detail}")]
    ContractViolation { action: String, detail: String },

    /// The resource exists but is in a state the operation cannot accept
    #[error("{action}: invalid state: {detail}")]
    InvalidState { action: String, detail: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

fn fmt_request_id(request_id: &Option<String>) -> String {
    request_id.as_deref().map(|id| format!(" (request id: {id})")).unwrap_or_default()
}

impl ConvergeError {
    /// Fatal remote failure
    pub fn fatal(action: impl Into<String>, source: RemoteError) -> Self {
        Self::Fatal { action: action.into(), source }
    }

    /// Contract violation
    pub fn contract(action: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ContractViolation { action: action.into(), detail: detail.into() }
    }

    /// Malformed composite identifier
    pub fn malformed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedIdentifier { id: id.into(), reason: reason.into() }
    }

    /// Action the error concerns, if any
    pub fn action(&self) -> Option<&str> {
        match self {
            Self::Fatal { action, .. }
            | Self::NotFound { action, .. }
            | Self::TaskFailed { action, .. }
            | Self::Timeout { action, .. }
            | Self::ContractViolation { action, .. }
            | Self::InvalidState { action, .. } => Some(action),
            Self::MalformedIdentifier { .. } | Self::Config(_) => None,
        }
    }

    /// Remote request-trace id, where the remote side provided one
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Fatal { source, .. } => source.request_id.as_deref(),
            Self::NotFound { request_id, .. } | Self::TaskFailed { request_id, .. } => {
                request_id.as_deref()
            }
            _ => None,
        }
    }

    /// Classification of this error from the caller's point of view
    ///
    /// Only a timeout is worth retrying as a whole.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Timeout { .. } => ErrorClass::Transient,
            Self::NotFound { .. } => ErrorClass::NotFound,
            _ => ErrorClass::Fatal,
        }
    }

    /// Whether this is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type alias for convergent operations
pub type Result<T> = std::result::Result<T, ConvergeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_surfaces_from_remote_cause() {
        let err = ConvergeError::fatal(
            "CreateDBInstances",
            RemoteError::new("AuthFailure", "signature expired").with_request_id("req-1"),
        );
        assert_eq!(err.request_id(), Some("req-1"));
        assert_eq!(err.action(), Some("CreateDBInstances"));
        assert_eq!(err.class(), ErrorClass::Fatal);
        assert!(err.to_string().contains("AuthFailure"));
    }

    #[test]
    fn test_task_failed_display_includes_status_and_request_id() {
        let err = ConvergeError::TaskFailed {
            action: "DescribeFlowStatus".into(),
            status: StatusCode::Int(1),
            request_id: Some("req-9".into()),
        };
        assert_eq!(
            err.to_string(),
            "DescribeFlowStatus: task failed with status 1 (request id: req-9)"
        );
        assert_eq!(err.request_id(), Some("req-9"));
    }

    #[test]
    fn test_class_mapping() {
        let timeout = ConvergeError::Timeout {
            action: "DescribeTasks".into(),
            elapsed: Duration::from_secs(60),
            attempts: 7,
            last_condition: Some("status 2".into()),
        };
        assert_eq!(timeout.class(), ErrorClass::Transient);
        assert!(timeout.is_timeout());

        let absent = ConvergeError::NotFound { action: "DescribeUser".into(), request_id: None };
        assert_eq!(absent.class(), ErrorClass::NotFound);
        assert_eq!(absent.to_string(), "DescribeUser: resource not found");

        assert_eq!(ConvergeError::malformed("a#b", "expected 3 parts").class(), ErrorClass::Fatal);
        assert_eq!(ConvergeError::contract("X", "empty response").class(), ErrorClass::Fatal);
    }
}
