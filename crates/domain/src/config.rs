//! Engine configuration structures
//!
//! Every section has defaults, so an empty file (or no file) yields a working
//! configuration. Durations are stored in milliseconds to keep the file format
//! flat.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::errors::{ConvergeError, Result};

/// Top-level configuration for one engine instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rate_limit: RateLimitConfig,
    pub retry: RetryConfig,
    pub classifier: ClassifierConfig,
    pub pagination: PaginationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<EndpointConfig>,
}

impl EngineConfig {
    /// Check every section, reporting the first problem found
    pub fn validate(&self) -> Result<()> {
        self.rate_limit.validate()?;
        self.retry.short_read.validate("short_read")?;
        self.retry.write.validate("write")?;
        self.retry.long_converge.validate("long_converge")?;
        if self.pagination.page_size == 0 {
            return Err(ConvergeError::Config("pagination.page_size must be at least 1".into()));
        }
        if let Some(endpoint) = &self.endpoint {
            endpoint.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Calls per interval for actions without an override
    pub default_budget: u64,
    pub interval_ms: u64,
    /// Watchdog: longest wait before acquisition fails open
    pub max_wait_ms: u64,
    /// Per-action budgets
    pub overrides: HashMap<String, u64>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_budget: DEFAULT_RATE_BUDGET,
            interval_ms: DEFAULT_RATE_INTERVAL_MS,
            max_wait_ms: DEFAULT_RATE_MAX_WAIT_MS,
            overrides: HashMap::new(),
        }
    }
}

impl RateLimitConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.default_budget == 0 {
            return Err(ConvergeError::Config("rate_limit.default_budget must be at least 1".into()));
        }
        if self.interval_ms == 0 {
            return Err(ConvergeError::Config("rate_limit.interval_ms must be at least 1".into()));
        }
        if self.max_wait_ms == 0 {
            return Err(ConvergeError::Config("rate_limit.max_wait_ms must be at least 1".into()));
        }
        if let Some((action, _)) = self.overrides.iter().find(|(_, budget)| **budget == 0) {
            return Err(ConvergeError::Config(format!(
                "rate_limit.overrides.{action} must be at least 1"
            )));
        }
        Ok(())
    }
}

/// Interval and deadline of one retry profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub interval_ms: u64,
    pub deadline_ms: u64,
}

impl ProfileConfig {
    pub const fn new(interval_ms: u64, deadline_ms: u64) -> Self {
        Self { interval_ms, deadline_ms }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(ConvergeError::Config(format!("retry.{name}.interval_ms must be at least 1")));
        }
        if self.deadline_ms < self.interval_ms {
            return Err(ConvergeError::Config(format!(
                "retry.{name}.deadline_ms ({}) is shorter than its interval ({})",
                self.deadline_ms, self.interval_ms
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub short_read: ProfileConfig,
    pub write: ProfileConfig,
    pub long_converge: ProfileConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            short_read: ProfileConfig::new(SHORT_READ_INTERVAL_MS, SHORT_READ_DEADLINE_MS),
            write: ProfileConfig::new(WRITE_INTERVAL_MS, WRITE_DEADLINE_MS),
            long_converge: ProfileConfig::new(LONG_CONVERGE_INTERVAL_MS, LONG_CONVERGE_DEADLINE_MS),
        }
    }
}

/// Error codes the code-table classifier recognises
///
/// A configured code matches itself and any dotted sub-code, so
/// `ResourceNotFound` also covers `ResourceNotFound.InstanceNotFound`.
/// Unlisted codes are fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub transient_codes: Vec<String>,
    pub not_found_codes: Vec<String>,
}

impl ClassifierConfig {
    /// Codes that are usually worth treating as transient or absent
    pub fn recommended() -> Self {
        let transient = [
            NETWORK_ERROR_CODE,
            HTTP_STATUS_ERROR_CODE,
            "RequestLimitExceeded",
            "InternalError",
            "ResourceInUse",
            "ResourceUnavailable",
            "FailedOperation.StatusConflict",
            "OperationDenied.InstanceStatusLimitError",
        ];
        Self {
            transient_codes: transient.iter().map(|c| (*c).to_string()).collect(),
            not_found_codes: vec!["ResourceNotFound".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { page_size: DEFAULT_PAGE_SIZE }
    }
}

/// Where the HTTP adapter sends requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), timeout_ms: DEFAULT_HTTP_TIMEOUT_MS }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(ConvergeError::Config("endpoint.url must not be empty".into()));
        }
        if self.timeout_ms == 0 {
            return Err(ConvergeError::Config("endpoint.timeout_ms must be at least 1".into()));
        }
        Ok(())
    }
}
