//! Transport adapters implementing the `RemoteClient` port

pub mod http;

pub use http::{HttpRemoteClient, HttpRemoteClientBuilder};
