//! Port interfaces for remote control-plane access

use async_trait::async_trait;
use convergent_domain::RemoteError;
use serde_json::Value;

/// Transport to the remote control plane
///
/// `Ok(None)` means the remote side declared success without a payload; the
/// engine treats that as a contract violation.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Invoke `action` with a JSON request body
    async fn invoke(
        &self,
        action: &str,
        request: &Value,
    ) -> std::result::Result<Option<Value>, RemoteError>;
}
