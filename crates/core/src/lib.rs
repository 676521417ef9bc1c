//! # Convergent Core
//!
//! The convergence and traversal engine.
//!
//! This crate contains:
//! - The `RemoteClient` port implemented by transport adapters
//! - `Gateway`: rate limiting, invocation, classification and retry for
//!   single calls and paginated scans
//! - `Paginator`: offset/limit traversal until a short page
//! - `ConvergenceWorkflow`: submission to terminal task state
//! - Existence and settlement helpers built on the retry poller
//!
//! ## Architecture Principles
//! - Depends on `convergent-common` and `convergent-domain` only
//! - No HTTP, file or environment access
//! - All external dependencies via traits

pub mod classifier;
pub mod convergence;
pub mod gateway;
pub mod lookups;
pub mod pagination;
pub mod ports;
pub mod settings;

pub use classifier::CodeTableClassifier;
pub use convergence::{ConvergenceWorkflow, JsonTaskProtocol, ResolvedOrder, TaskProtocol};
pub use gateway::Gateway;
pub use lookups::{await_absent, await_settled, ensure_accepted, find_exactly_one};
pub use pagination::Paginator;
pub use ports::RemoteClient;
