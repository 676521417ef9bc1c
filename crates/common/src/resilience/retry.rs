//! Fixed-interval retry polling bounded by a deadline
//!
//! A [`RetryPoller`] runs an async action repeatedly until it reports a final
//! value, fails with a non-retryable error, or the next attempt could no
//! longer start before the profile deadline. Each attempt yields either a
//! [`PollStep::Ready`] value or a [`PollStep::Pending`] condition ("not done
//! yet"); errors are routed through a [`RetryPolicy`].
//!
//! Timing: the first attempt starts immediately, later attempts start one
//! `interval` apart. After a pending or transient attempt the poller gives up
//! when `elapsed + interval >= deadline`, so an action that needs `k` retries
//! succeeds exactly when `k * interval < deadline`.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use super::{Clock, TokioClock};

/// Errors that can occur during retry operations
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The operation failed with a non-retryable error
    #[error("Operation failed with non-retryable error: {source}")]
    NonRetryable { source: E, attempts: u32 },

    /// The deadline would be exceeded by another attempt
    #[error("Retry deadline exceeded after {elapsed:?} ({attempts} attempts)")]
    TimeoutExceeded { elapsed: Duration, attempts: u32, last_condition: Option<String> },

    /// The retry profile is invalid
    #[error("Invalid retry configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// Result type for retry operations
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Outcome of a retry execution including result and summary statistics.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: RetryResult<T, E>,
    /// Number of times the action was invoked
    pub attempts: u32,
    /// Time from the first attempt to completion
    pub elapsed: Duration,
    /// Description of the last pending condition or retried error
    pub last_condition: Option<String>,
}

impl<T, E> RetryOutcome<T, E> {
    /// Consume the outcome and return only the result.
    pub fn into_result(self) -> RetryResult<T, E> {
        self.result
    }

    /// Number of retries after the first attempt
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Result of one poll attempt that did not error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep<T> {
    /// Final value, stop polling
    Ready(T),
    /// Not done yet; the string describes what is still being waited on
    Pending(String),
}

impl<T> PollStep<T> {
    /// Pending step with a condition description
    pub fn pending(condition: impl Into<String>) -> Self {
        Self::Pending(condition.into())
    }
}

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// Decide whether the poller should try again after `error`
    ///
    /// `attempt` is zero-based.
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the profile interval
    Retry,
    /// Don't retry the operation
    Stop,
}

/// Interval and deadline for one class of remote operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryProfile {
    /// Fixed delay between attempts
    pub interval: Duration,
    /// Upper bound on the total time spent polling
    pub deadline: Duration,
}

impl RetryProfile {
    /// Create a profile
    pub const fn new(interval: Duration, deadline: Duration) -> Self {
        Self { interval, deadline }
    }

    /// Reads and lookups: 2 seconds apart, at most 3 minutes
    pub const fn short_read() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(3 * 60))
    }

    /// Mutations: 2 seconds apart, at most 5 minutes
    pub const fn write() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(5 * 60))
    }

    /// Asynchronous task convergence: 10 seconds apart, at most 20 minutes
    pub const fn long_converge() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_secs(20 * 60))
    }

    /// Validate the profile
    pub fn validate(&self) -> Result<(), RetryError<()>> {
        if self.interval.is_zero() {
            return Err(RetryError::InvalidConfiguration {
                message: "interval must be greater than zero".to_string(),
            });
        }
        if self.deadline.is_zero() {
            return Err(RetryError::InvalidConfiguration {
                message: "deadline must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Named profile selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileKind {
    ShortRead,
    Write,
    LongConverge,
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortRead => write!(f, "short_read"),
            Self::Write => write!(f, "write"),
            Self::LongConverge => write!(f, "long_converge"),
        }
    }
}

/// The three profiles an engine uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryProfiles {
    pub short_read: RetryProfile,
    pub write: RetryProfile,
    pub long_converge: RetryProfile,
}

impl Default for RetryProfiles {
    fn default() -> Self {
        Self {
            short_read: RetryProfile::short_read(),
            write: RetryProfile::write(),
            long_converge: RetryProfile::long_converge(),
        }
    }
}

impl RetryProfiles {
    /// Profile for `kind`
    pub const fn get(&self, kind: ProfileKind) -> RetryProfile {
        match kind {
            ProfileKind::ShortRead => self.short_read,
            ProfileKind::Write => self.write,
            ProfileKind::LongConverge => self.long_converge,
        }
    }

    /// Validate every profile
    pub fn validate(&self) -> Result<(), RetryError<()>> {
        self.short_read.validate()?;
        self.write.validate()?;
        self.long_converge.validate()
    }
}

/// Fixed-interval poller
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use convergent_common::resilience::{policies::NeverRetry, PollStep, RetryPoller, RetryProfile};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let poller = RetryPoller::new(RetryProfile::new(Duration::from_millis(1), Duration::from_secs(1)));
/// let value = poller
///     .run(&NeverRetry, || async { Ok::<_, String>(PollStep::Ready(7)) })
///     .await
///     .expect("ready on first attempt");
/// assert_eq!(value, 7);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RetryPoller<C: Clock = TokioClock> {
    profile: RetryProfile,
    clock: C,
}

impl RetryPoller<TokioClock> {
    /// Poller on the tokio clock
    pub const fn new(profile: RetryProfile) -> Self {
        Self { profile, clock: TokioClock }
    }
}

impl<C: Clock> RetryPoller<C> {
    /// Poller with a custom clock
    pub const fn with_clock(profile: RetryProfile, clock: C) -> Self {
        Self { profile, clock }
    }

    /// Profile in effect
    pub const fn profile(&self) -> RetryProfile {
        self.profile
    }

    /// Run `action` until it is ready, fails terminally or times out
    pub async fn run<F, Fut, T, E, P>(&self, policy: &P, action: F) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<PollStep<T>, E>>,
    {
        self.run_with_outcome(policy, action).await.into_result()
    }

    /// Like [`run`](Self::run), also reporting attempt statistics
    pub async fn run_with_outcome<F, Fut, T, E, P>(
        &self,
        policy: &P,
        mut action: F,
    ) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<PollStep<T>, E>>,
    {
        let started = self.clock.now();
        let mut attempts: u32 = 0;
        let mut last_condition: Option<String> = None;

        loop {
            attempts += 1;

            match action().await {
                Ok(PollStep::Ready(value)) => {
                    if attempts > 1 {
                        debug!(attempts, "poll converged after retries");
                    }
                    return RetryOutcome {
                        result: Ok(value),
                        attempts,
                        elapsed: self.clock.now().saturating_duration_since(started),
                        last_condition,
                    };
                }
                Ok(PollStep::Pending(condition)) => {
                    debug!(attempt = attempts, condition = %condition, "poll pending");
                    last_condition = Some(condition);
                }
                Err(error) => match policy.should_retry(&error, attempts - 1) {
                    RetryDecision::Stop => {
                        debug!(attempt = attempts, error = %error, "retry policy stopped polling");
                        return RetryOutcome {
                            elapsed: self.clock.now().saturating_duration_since(started),
                            last_condition: Some(error.to_string()),
                            result: Err(RetryError::NonRetryable { source: error, attempts }),
                            attempts,
                        };
                    }
                    RetryDecision::Retry => {
                        debug!(attempt = attempts, error = %error, "transient failure, will retry");
                        last_condition = Some(error.to_string());
                    }
                },
            }

            let elapsed = self.clock.now().saturating_duration_since(started);
            if elapsed + self.profile.interval >= self.profile.deadline {
                warn!(
                    attempts,
                    elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    last_condition = last_condition.as_deref().unwrap_or(""),
                    "retry deadline exceeded"
                );
                return RetryOutcome {
                    result: Err(RetryError::TimeoutExceeded {
                        elapsed,
                        attempts,
                        last_condition: last_condition.clone(),
                    }),
                    attempts,
                    elapsed,
                    last_condition,
                };
            }

            tokio::time::sleep(self.profile.interval).await;
        }
    }
}

/// Pre-defined retry policies for common scenarios
pub mod policies {
    use super::*;
    use crate::error::ErrorClassifier;

    /// Always retry policy - retries on any error
    #[derive(Debug, Clone, Copy)]
    pub struct AlwaysRetry;

    impl<E> RetryPolicy<E> for AlwaysRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Retry
        }
    }

    /// Never retry policy - never retries
    #[derive(Debug, Clone, Copy)]
    pub struct NeverRetry;

    impl<E> RetryPolicy<E> for NeverRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Stop
        }
    }

    /// Predicate-based retry policy
    #[derive(Debug)]
    pub struct PredicateRetry<F> {
        predicate: F,
    }

    impl<F> PredicateRetry<F> {
        pub const fn new(predicate: F) -> Self {
            Self { predicate }
        }
    }

    impl<F, E> RetryPolicy<E> for PredicateRetry<F>
    where
        F: Fn(&E, u32) -> bool,
    {
        fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision {
            if (self.predicate)(error, attempt) {
                RetryDecision::Retry
            } else {
                RetryDecision::Stop
            }
        }
    }

    /// Retries exactly the errors an [`ErrorClassifier`] reports as transient
    #[derive(Debug, Clone)]
    pub struct ClassifiedRetry<C> {
        classifier: C,
    }

    impl<C> ClassifiedRetry<C> {
        pub const fn new(classifier: C) -> Self {
            Self { classifier }
        }
    }

    impl<C, E> RetryPolicy<E> for ClassifiedRetry<C>
    where
        C: ErrorClassifier<E>,
    {
        fn should_retry(&self, error: &E, _attempt: u32) -> RetryDecision {
            if self.classifier.classify(error).is_retryable() {
                RetryDecision::Retry
            } else {
                RetryDecision::Stop
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the retry poller and policies
    //!
    //! Timing tests run on paused tokio time so deadlines of minutes complete
    //! instantly.

    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::policies::*;
    use super::*;
    use crate::error::{ErrorClass, FnClassifier};

    fn profile(interval_ms: u64, deadline_ms: u64) -> RetryProfile {
        RetryProfile::new(Duration::from_millis(interval_ms), Duration::from_millis(deadline_ms))
    }

    /// Action that fails transiently `failures` times, then succeeds
    fn flaky(
        counter: Arc<AtomicU32>,
        failures: u32,
    ) -> impl FnMut() -> std::future::Ready<Result<PollStep<u32>, String>> {
        move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(if n < failures {
                Err(format!("busy #{n}"))
            } else {
                Ok(PollStep::Ready(n))
            })
        }
    }

    #[test]
    fn test_default_profiles() {
        let profiles = RetryProfiles::default();
        assert_eq!(profiles.get(ProfileKind::ShortRead), profile(2_000, 180_000));
        assert_eq!(profiles.get(ProfileKind::Write), profile(2_000, 300_000));
        assert_eq!(profiles.get(ProfileKind::LongConverge), profile(10_000, 1_200_000));
        assert!(profiles.validate().is_ok());
    }

    #[test]
    fn test_profile_validation() {
        assert!(profile(0, 1_000).validate().is_err());
        assert!(profile(1_000, 0).validate().is_err());
    }

    #[test]
    fn test_classified_retry_follows_classifier() {
        let policy = ClassifiedRetry::new(FnClassifier::new(|code: &String| {
            if code == "RequestLimitExceeded" {
                ErrorClass::Transient
            } else if code == "ResourceNotFound" {
                ErrorClass::NotFound
            } else {
                ErrorClass::Fatal
            }
        }));

        assert_eq!(policy.should_retry(&"RequestLimitExceeded".to_string(), 0), RetryDecision::Retry);
        assert_eq!(policy.should_retry(&"ResourceNotFound".to_string(), 0), RetryDecision::Stop);
        assert_eq!(policy.should_retry(&"AuthFailure".to_string(), 0), RetryDecision::Stop);
    }

    #[test]
    fn test_predicate_retry() {
        let policy = PredicateRetry::new(|_: &&str, attempt: u32| attempt < 2);
        assert_eq!(policy.should_retry(&"e", 0), RetryDecision::Retry);
        assert_eq!(policy.should_retry(&"e", 2), RetryDecision::Stop);
    }

    /// Ready on the first attempt never sleeps
    #[tokio::test(start_paused = true)]
    async fn test_ready_immediately() {
        let poller = RetryPoller::new(profile(2_000, 10_000));
        let start = tokio::time::Instant::now();

        let outcome = poller
            .run_with_outcome(&AlwaysRetry, || async { Ok::<_, String>(PollStep::Ready("done")) })
            .await;

        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.retries(), 0);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(outcome.into_result().expect("ready"), "done");
    }

    /// k transient failures succeed exactly when k * interval < deadline
    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_bounded_by_deadline() {
        // interval 2s, deadline 10s: k = 4 fits (8s < 10s), k = 5 does not (10s)
        for (failures, should_succeed) in [(0, true), (1, true), (4, true), (5, false), (9, false)] {
            let counter = Arc::new(AtomicU32::new(0));
            let poller = RetryPoller::new(profile(2_000, 10_000));

            let outcome =
                poller.run_with_outcome(&AlwaysRetry, flaky(Arc::clone(&counter), failures)).await;

            if should_succeed {
                assert_eq!(outcome.attempts, failures + 1, "k = {failures}");
                assert!(outcome.result.is_ok(), "k = {failures} should succeed");
            } else {
                assert_eq!(outcome.attempts, 5, "k = {failures}");
                match outcome.result {
                    Err(RetryError::TimeoutExceeded { attempts, last_condition, .. }) => {
                        assert_eq!(attempts, 5);
                        assert_eq!(last_condition.as_deref(), Some("busy #4"));
                    }
                    other => panic!("expected timeout, got {other:?}"),
                }
            }
        }
    }

    /// A stop decision returns after exactly one attempt with no sleeping
    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_stops_immediately() {
        let counter = Arc::new(AtomicU32::new(0));
        let poller = RetryPoller::new(profile(2_000, 60_000));
        let start = tokio::time::Instant::now();

        let result = poller.run(&NeverRetry, flaky(Arc::clone(&counter), 3)).await;

        match result {
            Err(RetryError::NonRetryable { source, attempts }) => {
                assert_eq!(source, "busy #0");
                assert_eq!(attempts, 1);
            }
            other => panic!("expected non-retryable, got {other:?}"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    /// Pending steps are polled at the fixed interval and reported on timeout
    #[tokio::test(start_paused = true)]
    async fn test_pending_condition_reported_on_timeout() {
        let poller = RetryPoller::new(profile(10_000, 30_000));
        let start = tokio::time::Instant::now();

        let outcome = poller
            .run_with_outcome(&NeverRetry, || async {
                Ok::<PollStep<()>, String>(PollStep::pending("status 2 (running)"))
            })
            .await;

        // Attempts at 0s, 10s, 20s; a fourth would start at 30s
        assert_eq!(outcome.attempts, 3);
        assert_eq!(start.elapsed(), Duration::from_secs(20));
        assert_eq!(outcome.last_condition.as_deref(), Some("status 2 (running)"));
        assert!(matches!(outcome.result, Err(RetryError::TimeoutExceeded { .. })));
    }
}
