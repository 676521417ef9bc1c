//! Generic resilience utilities shared across convergent crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: error classification taxonomy
//! - `runtime`: async infrastructure (clock, rate limiting, retry polling)
//! - `observability`: tracing (pulled in by `runtime`)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{AlwaysFatal, ErrorClass, ErrorClassifier, FnClassifier};
#[cfg(feature = "runtime")]
pub use resilience::{
    Clock, MockClock, PollStep, ProfileKind, RateLimiter, RateLimiterConfig, RetryDecision,
    RetryError, RetryOutcome, RetryPoller, RetryPolicy, RetryProfile, RetryProfiles, RetryResult,
    SystemClock, TokenBucket, TokioClock,
};
