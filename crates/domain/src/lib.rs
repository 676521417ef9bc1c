//! # Convergent Domain
//!
//! Value types shared by the convergence engine and its adapters.
//!
//! This crate contains:
//! - Remote call vocabulary (RemoteError, AsyncHandle, Submission, etc.)
//! - Poll status mapping (StatusCode, StatusTable, PollOutcome)
//! - Composite identifier codec
//! - The surfaced error type and Result alias
//! - Configuration structures and constants
//!
//! ## Architecture
//! - Depends only on the foundation tier of `convergent-common`
//! - No I/O, no async runtime

pub mod config;
pub mod constants;
pub mod errors;
pub mod ids;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use convergent_common::error::ErrorClass;
pub use errors::*;
pub use ids::{CompositeId, CompositeIdCodec};
pub use types::*;
