//! Rate limiting for outbound remote calls
//!
//! Two layers:
//! - [`TokenBucket`]: a single budget of `capacity` tokens, refilled by
//!   `refill_amount` every `refill_interval`
//! - [`RateLimiter`]: one token bucket per action name, created lazily and
//!   shared by every caller of the same limiter instance
//!
//! [`RateLimiter::acquire`] blocks the calling task until its action's bucket
//! has a token. A watchdog bounds the wait: once `max_wait` has elapsed the
//! call proceeds anyway (fail open) and a warning is logged.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{Clock, TokioClock};

/// Smallest sleep between two acquisition attempts
const MIN_WAIT_SLICE: Duration = Duration::from_millis(1);

/// Configuration for token bucket rate limiter
#[derive(Debug, Clone)]
pub struct TokenBucketConfig {
    /// Maximum number of tokens the bucket can hold
    pub capacity: u64,
    /// Number of tokens to refill per interval
    pub refill_amount: u64,
    /// Time interval for token refill
    pub refill_interval: Duration,
}

impl Default for TokenBucketConfig {
    fn default() -> Self {
        Self { capacity: 20, refill_amount: 20, refill_interval: Duration::from_secs(1) }
    }
}

impl TokenBucketConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("capacity must be greater than 0".to_string());
        }
        if self.refill_amount == 0 {
            return Err("refill_amount must be greater than 0".to_string());
        }
        if self.refill_interval.is_zero() {
            return Err("refill_interval must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: u64,
    last_refill: Instant,
}

/// Token bucket rate limiter
///
/// Refills happen in whole intervals measured from the bucket's creation, so
/// at most `capacity` tokens are handed out between two refill boundaries when
/// `refill_amount == capacity`.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use convergent_common::resilience::TokenBucket;
///
/// # fn example() -> Result<(), String> {
/// let limiter = TokenBucket::new(10, 5, Duration::from_secs(1))?;
///
/// assert!(limiter.try_acquire(3));
/// assert_eq!(limiter.available_tokens(), 7);
/// # Ok(())
/// # }
/// ```
pub struct TokenBucket<C: Clock = TokioClock> {
    config: TokenBucketConfig,
    state: Mutex<BucketState>,
    clock: C,
}

impl<C: Clock> TokenBucket<C> {
    /// Create a new token bucket with custom clock
    pub fn with_clock(
        capacity: u64,
        refill_amount: u64,
        refill_interval: Duration,
        clock: C,
    ) -> Result<Self, String> {
        let config = TokenBucketConfig { capacity, refill_amount, refill_interval };
        config.validate()?;
        Ok(Self::from_config(config, clock))
    }

    /// Build from an already validated configuration
    fn from_config(config: TokenBucketConfig, clock: C) -> Self {
        Self {
            state: Mutex::new(BucketState { tokens: config.capacity, last_refill: clock.now() }),
            clock,
            config,
        }
    }

    /// Refill tokens for every whole interval elapsed since the last refill
    fn refill(&self, state: &mut BucketState) {
        let now = self.clock.now();
        let elapsed = now.saturating_duration_since(state.last_refill);
        let refills = elapsed.as_nanos() / self.config.refill_interval.as_nanos();

        if refills > 0 {
            let refills = u64::try_from(refills).unwrap_or(u64::MAX);
            let tokens_to_add = refills.saturating_mul(self.config.refill_amount);
            state.tokens = state.tokens.saturating_add(tokens_to_add).min(self.config.capacity);

            // Keep the refill schedule anchored so partial intervals are not lost
            let advance = u32::try_from(refills)
                .ok()
                .and_then(|n| self.config.refill_interval.checked_mul(n))
                .unwrap_or(elapsed);
            state.last_refill += advance;

            debug!(added = tokens_to_add, available = state.tokens, "refilled token bucket");
        }
    }

    /// Try to acquire the specified number of tokens
    ///
    /// Returns `true` if tokens were acquired, `false` if not enough tokens
    /// available.
    pub fn try_acquire(&self, tokens: u64) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state);

        if state.tokens < tokens {
            return false;
        }
        state.tokens -= tokens;
        true
    }

    /// Get the current number of available tokens
    pub fn available_tokens(&self) -> u64 {
        let mut state = self.state.lock();
        self.refill(&mut state);
        state.tokens
    }

    /// Time until the next refill boundary, or zero if a token is available now
    pub fn time_until_available(&self) -> Duration {
        let mut state = self.state.lock();
        self.refill(&mut state);

        if state.tokens > 0 {
            return Duration::ZERO;
        }
        let since_refill = self.clock.now().saturating_duration_since(state.last_refill);
        self.config.refill_interval.saturating_sub(since_refill)
    }

    /// Reset the limiter to full capacity
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.tokens = self.config.capacity;
        state.last_refill = self.clock.now();
    }
}

impl TokenBucket<TokioClock> {
    /// Create a new token bucket on the tokio clock
    pub fn new(
        capacity: u64,
        refill_amount: u64,
        refill_interval: Duration,
    ) -> Result<Self, String> {
        Self::with_clock(capacity, refill_amount, refill_interval, TokioClock)
    }
}

/// Configuration for the per-action [`RateLimiter`]
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Calls admitted per interval for actions without an override
    pub default_budget: u64,
    /// Length of one budget interval
    pub interval: Duration,
    /// Watchdog: longest a caller waits before the limiter fails open
    pub max_wait: Duration,
    /// Per-action budgets
    pub overrides: HashMap<String, u64>,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            default_budget: 20,
            interval: Duration::from_secs(1),
            max_wait: Duration::from_secs(60),
            overrides: HashMap::new(),
        }
    }
}

impl RateLimiterConfig {
    /// Set a dedicated budget for one action
    pub fn with_override(mut self, action: impl Into<String>, budget: u64) -> Self {
        self.overrides.insert(action.into(), budget);
        self
    }

    /// Budget that applies to `action`
    pub fn budget_for(&self, action: &str) -> u64 {
        self.overrides.get(action).copied().unwrap_or(self.default_budget)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.default_budget == 0 {
            return Err("default_budget must be greater than 0".to_string());
        }
        if self.interval.is_zero() {
            return Err("interval must be greater than zero".to_string());
        }
        if self.max_wait.is_zero() {
            return Err("max_wait must be greater than zero".to_string());
        }
        if let Some((action, _)) = self.overrides.iter().find(|(_, budget)| **budget == 0) {
            return Err(format!("override for '{action}' must be greater than 0"));
        }
        Ok(())
    }
}

/// Per-action rate limiter
///
/// Each action name gets its own bucket, so one action exhausting its budget
/// never delays callers of another action. The limiter is `Send + Sync` and
/// meant to be shared behind an `Arc` by every call site of one engine.
pub struct RateLimiter<C: Clock + Clone = TokioClock> {
    config: RateLimiterConfig,
    buckets: DashMap<String, Arc<TokenBucket<C>>>,
    clock: C,
}

impl RateLimiter<TokioClock> {
    /// Create a limiter on the tokio clock
    pub fn new(config: RateLimiterConfig) -> Result<Self, String> {
        Self::with_clock(config, TokioClock)
    }
}

impl<C: Clock + Clone> RateLimiter<C> {
    /// Create a limiter with a custom clock
    pub fn with_clock(config: RateLimiterConfig, clock: C) -> Result<Self, String> {
        config.validate()?;
        Ok(Self { config, buckets: DashMap::new(), clock })
    }

    /// Configuration in effect
    pub const fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    fn bucket(&self, action: &str) -> Arc<TokenBucket<C>> {
        if let Some(bucket) = self.buckets.get(action) {
            return Arc::clone(bucket.value());
        }

        let entry = self.buckets.entry(action.to_string()).or_insert_with(|| {
            let budget = self.config.budget_for(action);
            let config = TokenBucketConfig {
                capacity: budget,
                refill_amount: budget,
                refill_interval: self.config.interval,
            };
            Arc::new(TokenBucket::from_config(config, self.clock.clone()))
        });
        Arc::clone(entry.value())
    }

    /// Non-blocking variant of [`acquire`](Self::acquire)
    pub fn try_acquire(&self, action: &str) -> bool {
        self.bucket(action).try_acquire(1)
    }

    /// Block until `action` may issue one call, consuming one unit of its
    /// budget
    ///
    /// Never errors. If the watchdog bound elapses the caller is let through.
    pub async fn acquire(&self, action: &str) {
        let bucket = self.bucket(action);
        let started = self.clock.now();

        loop {
            if bucket.try_acquire(1) {
                return;
            }

            let waited = self.clock.now().saturating_duration_since(started);
            if waited >= self.config.max_wait {
                warn!(
                    action = %action,
                    waited_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                    "rate limiter watchdog expired, proceeding without a token"
                );
                return;
            }

            let wait = bucket
                .time_until_available()
                .max(MIN_WAIT_SLICE)
                .min(self.config.max_wait - waited);
            debug!(
                action = %action,
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                "rate limited, waiting"
            );
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::MockClock;
    use super::*;

    #[test]
    fn test_token_bucket_basic() {
        let bucket = TokenBucket::with_clock(10, 5, Duration::from_secs(1), MockClock::new())
            .expect("valid bucket");

        assert!(bucket.try_acquire(5));
        assert_eq!(bucket.available_tokens(), 5);

        assert!(bucket.try_acquire(5));
        assert_eq!(bucket.available_tokens(), 0);

        assert!(!bucket.try_acquire(1));
    }

    #[test]
    fn test_token_bucket_refill() {
        let clock = MockClock::new();
        let bucket = TokenBucket::with_clock(10, 5, Duration::from_millis(100), clock.clone())
            .expect("valid bucket");

        assert!(bucket.try_acquire(10));
        assert_eq!(bucket.available_tokens(), 0);

        clock.advance_millis(100);
        assert_eq!(bucket.available_tokens(), 5);

        clock.advance_millis(100);
        assert_eq!(bucket.available_tokens(), 10); // Capped at capacity
    }

    #[test]
    fn test_token_bucket_keeps_partial_intervals() {
        let clock = MockClock::new();
        let bucket = TokenBucket::with_clock(1, 1, Duration::from_millis(100), clock.clone())
            .expect("valid bucket");

        assert!(bucket.try_acquire(1));
        clock.advance_millis(150);
        assert!(bucket.try_acquire(1));

        // Next boundary is at 200ms, not 250ms
        clock.advance_millis(50);
        assert!(bucket.try_acquire(1));
    }

    #[test]
    fn test_time_until_available() {
        let clock = MockClock::new();
        let bucket = TokenBucket::with_clock(1, 1, Duration::from_millis(100), clock.clone())
            .expect("valid bucket");

        assert_eq!(bucket.time_until_available(), Duration::ZERO);
        assert!(bucket.try_acquire(1));

        clock.advance_millis(30);
        assert_eq!(bucket.time_until_available(), Duration::from_millis(70));
    }

    #[test]
    fn test_token_bucket_config_validation() {
        let base = TokenBucketConfig::default();
        assert!(base.validate().is_ok());
        assert!(TokenBucketConfig { capacity: 0, ..base.clone() }.validate().is_err());
        assert!(TokenBucketConfig { refill_amount: 0, ..base.clone() }.validate().is_err());
        assert!(TokenBucketConfig { refill_interval: Duration::ZERO, ..base }.validate().is_err());
    }

    #[test]
    fn test_rate_limiter_config_validation() {
        assert!(RateLimiterConfig::default().validate().is_ok());
        assert!(RateLimiterConfig { default_budget: 0, ..Default::default() }.validate().is_err());
        assert!(RateLimiterConfig { max_wait: Duration::ZERO, ..Default::default() }
            .validate()
            .is_err());

        let mut overrides = HashMap::new();
        overrides.insert("DescribeFlowStatus".to_string(), 0);
        assert!(RateLimiterConfig { overrides, ..Default::default() }.validate().is_err());
    }

    #[test]
    fn test_override_budget_applies_per_action() {
        let limiter = RateLimiter::with_clock(
            RateLimiterConfig { default_budget: 5, ..Default::default() }
                .with_override("CreateDBInstances", 2),
            MockClock::new(),
        )
        .expect("valid limiter");

        assert!(limiter.try_acquire("CreateDBInstances"));
        assert!(limiter.try_acquire("CreateDBInstances"));
        assert!(!limiter.try_acquire("CreateDBInstances"));

        for _ in 0..5 {
            assert!(limiter.try_acquire("DescribeDBInstances"));
        }
        assert!(!limiter.try_acquire("DescribeDBInstances"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_next_interval() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            default_budget: 1,
            interval: Duration::from_millis(500),
            ..Default::default()
        })
        .expect("valid limiter");

        let start = tokio::time::Instant::now();
        limiter.acquire("DescribeAccounts").await;
        limiter.acquire("DescribeAccounts").await;

        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_action_does_not_block_other_actions() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            default_budget: 1,
            interval: Duration::from_secs(10),
            ..Default::default()
        })
        .expect("valid limiter");

        let start = tokio::time::Instant::now();
        limiter.acquire("DescribeUser").await;
        limiter.acquire("DescribeAcl").await;
        limiter.acquire("DescribeTopic").await;

        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_fails_open() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            default_budget: 1,
            interval: Duration::from_secs(3600),
            max_wait: Duration::from_secs(2),
            ..Default::default()
        })
        .expect("valid limiter");

        let start = tokio::time::Instant::now();
        limiter.acquire("DeleteUser").await;
        limiter.acquire("DeleteUser").await;

        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(2));
        assert!(waited < Duration::from_secs(3600));
    }
}
