//! # Convergent Infrastructure
//!
//! Adapters around the engine in `convergent-core`.
//!
//! This crate contains:
//! - Configuration loading from environment variables and TOML/JSON files
//! - Tracing subscriber initialisation
//! - `HttpRemoteClient`, a JSON-over-HTTP implementation of `RemoteClient`
//! - `EngineBuilder`, which wires configuration into a ready gateway and
//!   convergence workflow
//!
//! ## Architecture
//! - Implements traits defined in `convergent-core`
//! - Contains all "impure" code (network, files, environment)

pub mod config;
pub mod engine;
pub mod observability;
pub mod remote;

pub use engine::{Engine, EngineBuilder};
pub use observability::{init_tracing, LogFormat};
pub use remote::{HttpRemoteClient, HttpRemoteClientBuilder};
