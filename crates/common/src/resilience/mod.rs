//! Resilience patterns for talking to rate-limited, eventually consistent
//! control planes
//!
//! This module provides **generic, reusable** building blocks:
//! - **Clock**: time abstraction so budgets and deadlines can be tested on
//!   virtual time
//! - **Rate Limiting**: a token bucket and a per-action [`RateLimiter`] that
//!   blocks callers until their action's budget allows them through
//! - **Retry Polling**: a fixed-interval [`RetryPoller`] bounded by a
//!   [`RetryProfile`] deadline, with a pluggable [`RetryPolicy`]
//!
//! Nothing in here knows about remote payloads. The convergence engine in
//! `convergent-core` composes these pieces with its own error taxonomy.

pub mod clock;
pub mod rate_limiter;
pub mod retry;

pub use clock::{Clock, MockClock, SystemClock, TokioClock};
pub use rate_limiter::{RateLimiter, RateLimiterConfig, TokenBucket, TokenBucketConfig};
pub use retry::{
    policies, PollStep, ProfileKind, RetryDecision, RetryError, RetryOutcome, RetryPoller,
    RetryPolicy, RetryProfile, RetryProfiles, RetryResult,
};
