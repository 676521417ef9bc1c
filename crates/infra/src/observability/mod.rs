//! Tracing subscriber setup
//!
//! The engine only emits `tracing` events and spans; binaries and tests that
//! want to see them call [`init_tracing`] once at startup.
//!
//! ## Filtering
//! Directives come from `CONVERGENT_LOG`, then `RUST_LOG`, and default to
//! `info`. For example:
//!
//! ```bash
//! CONVERGENT_LOG=info,convergent_core::gateway=debug
//! ```

use convergent_domain::{ConvergeError, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_ENV: &str = "CONVERGENT_LOG";
const DEFAULT_DIRECTIVES: &str = "info";

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Single-line human readable output
    #[default]
    Compact,
    /// One JSON object per event, for log aggregation
    Json,
}

/// Install the global subscriber with directives from the environment
///
/// Returns `Ok(false)` when a global subscriber is already installed.
///
/// # Errors
/// Returns `ConvergeError::Config` if `CONVERGENT_LOG` or `RUST_LOG` holds
/// invalid directives.
pub fn init_tracing(format: LogFormat) -> Result<bool> {
    let directives = std::env::var(LOG_ENV)
        .or_else(|_| std::env::var(EnvFilter::DEFAULT_ENV))
        .unwrap_or_else(|_| DEFAULT_DIRECTIVES.to_string());

    init_tracing_with_filter(format, &directives)
}

/// Install the global subscriber with explicit filter directives
///
/// # Errors
/// Returns `ConvergeError::Config` if `directives` do not parse.
pub fn init_tracing_with_filter(format: LogFormat, directives: &str) -> Result<bool> {
    let filter = build_filter(directives)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };

    match installed {
        Ok(()) => Ok(true),
        Err(error) => {
            tracing::debug!(%error, "global subscriber already installed");
            Ok(false)
        }
    }
}

fn build_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| ConvergeError::Config(format!("Invalid log directives '{directives}': {e}")))
}
