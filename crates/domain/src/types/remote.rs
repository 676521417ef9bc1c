use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DECODE_ERROR_CODE, HTTP_STATUS_ERROR_CODE, NETWORK_ERROR_CODE};

/// Failure reported by a remote-client adapter
///
/// `code` is the remote service's error code (for example
/// `ResourceNotFound.InstanceNotFound`). Classification reads only the code.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("[{code}] {message}")]
pub struct RemoteError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl RemoteError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into(), request_id: None }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Transport-level failure before any response arrived
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(NETWORK_ERROR_CODE, message)
    }

    /// Non-success HTTP status without a decodable error body
    pub fn http_status(status: u16, body: impl AsRef<str>) -> Self {
        Self::new(HTTP_STATUS_ERROR_CODE, format!("http status {status}: {}", body.as_ref()))
    }

    /// Successful HTTP status with a body that is not the expected envelope
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(DECODE_ERROR_CODE, message)
    }

    /// Whether the code equals `code` or is a dotted sub-code of it
    pub fn code_matches(&self, code: &str) -> bool {
        self.code == code
            || self.code.strip_prefix(code).is_some_and(|rest| rest.starts_with('.'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_matches_prefix_segments() {
        let err = RemoteError::new("ResourceNotFound.InstanceNotFound", "gone");
        assert!(err.code_matches("ResourceNotFound"));
        assert!(err.code_matches("ResourceNotFound.InstanceNotFound"));
        assert!(!err.code_matches("Resource"));
        assert!(!err.code_matches("ResourceNotFound.Other"));
    }

    #[test]
    fn test_display() {
        let err = RemoteError::network("connection reset").with_request_id("r-1");
        assert_eq!(err.to_string(), "[ClientError.NetworkError] connection reset");
        assert_eq!(err.request_id.as_deref(), Some("r-1"));
    }
}
