//! Rate-limited, classified, retried access to the remote control plane
//!
//! Every remote call made by the engine goes through a [`Gateway`]:
//! 1. acquire a token for the action from the shared [`RateLimiter`]
//! 2. invoke the [`RemoteClient`]
//! 3. classify a failure exactly once with the configured classifier
//! 4. retry transient failures under the chosen [`ProfileKind`]
//!
//! Callers pick a [`NotFoundPolicy`] per call. With `Absent`, a not-found
//! classification yields `None` instead of an error.

use std::fmt;
use std::sync::Arc;

use convergent_common::error::{ErrorClass, ErrorClassifier};
use convergent_common::resilience::{
    PollStep, ProfileKind, RateLimiter, RetryDecision, RetryError, RetryPoller, RetryPolicy,
    RetryProfile, RetryProfiles,
};
use convergent_domain::constants::DEFAULT_PAGE_SIZE;
use convergent_domain::{ConvergeError, NotFoundPolicy, PageRequest, RemoteError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::pagination::Paginator;
use crate::ports::RemoteClient;

/// Failure of one attempt, already classified
#[derive(Debug)]
pub(crate) enum AttemptFailure {
    /// Worth another attempt within the deadline
    Transient(RemoteError),
    /// Final; surfaced as is
    Terminal(ConvergeError),
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient(error) => write!(f, "{error}"),
            Self::Terminal(error) => write!(f, "{error}"),
        }
    }
}

impl From<ConvergeError> for AttemptFailure {
    fn from(error: ConvergeError) -> Self {
        Self::Terminal(error)
    }
}

/// Retries transient failures only
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryTransient;

impl RetryPolicy<AttemptFailure> for RetryTransient {
    fn should_retry(&self, error: &AttemptFailure, _attempt: u32) -> RetryDecision {
        match error {
            AttemptFailure::Transient(_) => RetryDecision::Retry,
            AttemptFailure::Terminal(_) => RetryDecision::Stop,
        }
    }
}

/// Translate a poller failure into the surfaced error for `action`
pub(crate) fn map_retry_error(action: &str, error: RetryError<AttemptFailure>) -> ConvergeError {
    match error {
        RetryError::NonRetryable { source: AttemptFailure::Terminal(error), .. } => error,
        RetryError::NonRetryable { source: AttemptFailure::Transient(error), .. } => {
            ConvergeError::fatal(action, error)
        }
        RetryError::TimeoutExceeded { elapsed, attempts, last_condition } => {
            ConvergeError::Timeout { action: action.to_string(), elapsed, attempts, last_condition }
        }
        RetryError::InvalidConfiguration { message } => ConvergeError::Config(message),
    }
}

/// Entry point for all remote calls of one engine
pub struct Gateway {
    client: Arc<dyn RemoteClient>,
    limiter: Arc<RateLimiter>,
    classifier: Arc<dyn ErrorClassifier<RemoteError>>,
    profiles: RetryProfiles,
    page_size: u64,
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("profiles", &self.profiles)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Gateway with default profiles and page size
    pub fn new(
        client: Arc<dyn RemoteClient>,
        limiter: Arc<RateLimiter>,
        classifier: Arc<dyn ErrorClassifier<RemoteError>>,
    ) -> Self {
        Self {
            client,
            limiter,
            classifier,
            profiles: RetryProfiles::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_profiles(mut self, profiles: RetryProfiles) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn with_page_size(mut self, page_size: u64) -> Result<Self> {
        if page_size == 0 {
            return Err(ConvergeError::Config("page size must be at least 1".into()));
        }
        self.page_size = page_size;
        Ok(self)
    }

    pub const fn profile(&self, kind: ProfileKind) -> RetryProfile {
        self.profiles.get(kind)
    }

    pub const fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// One rate-limited call, no classification or retry
    pub async fn invoke(
        &self,
        action: &str,
        request: &Value,
    ) -> std::result::Result<Option<Value>, RemoteError> {
        self.limiter.acquire(action).await;
        self.client.invoke(action, request).await
    }

    /// One classified attempt; `Ok(None)` means tolerated absence
    pub(crate) async fn attempt(
        &self,
        action: &str,
        request: &Value,
        not_found: NotFoundPolicy,
    ) -> std::result::Result<Option<Value>, AttemptFailure> {
        match self.invoke(action, request).await {
            Ok(Some(payload)) => Ok(Some(payload)),
            Ok(None) => Err(ConvergeError::contract(action, "empty response").into()),
            Err(error) => match self.classifier.classify(&error) {
                ErrorClass::Transient => {
                    warn!(action, code = %error.code, "transient remote error");
                    Err(AttemptFailure::Transient(error))
                }
                ErrorClass::NotFound if not_found.tolerates_absence() => {
                    debug!(action, code = %error.code, "resource absent");
                    Ok(None)
                }
                ErrorClass::NotFound => Err(ConvergeError::NotFound {
                    action: action.to_string(),
                    request_id: error.request_id,
                }
                .into()),
                ErrorClass::Fatal => Err(ConvergeError::fatal(action, error).into()),
            },
        }
    }

    /// Call `action`, retrying transient failures under `profile`
    ///
    /// Returns `None` only when the resource is absent and `not_found` is
    /// [`NotFoundPolicy::Absent`].
    #[instrument(skip_all, fields(action = %action, profile = %profile))]
    pub async fn call(
        &self,
        action: &str,
        request: &Value,
        profile: ProfileKind,
        not_found: NotFoundPolicy,
    ) -> Result<Option<Value>> {
        RetryPoller::new(self.profile(profile))
            .run(&RetryTransient, move || async move {
                self.attempt(action, request, not_found).await.map(PollStep::Ready)
            })
            .await
            .map_err(|error| map_retry_error(action, error))
    }

    /// [`call`](Self::call) with the payload deserialized into `T`
    pub async fn call_typed<T: DeserializeOwned>(
        &self,
        action: &str,
        request: &Value,
        profile: ProfileKind,
        not_found: NotFoundPolicy,
    ) -> Result<Option<T>> {
        self.call(action, request, profile, not_found)
            .await?
            .map(|payload| {
                serde_json::from_value(payload).map_err(|error| {
                    ConvergeError::contract(action, format!("unexpected payload: {error}"))
                })
            })
            .transpose()
    }

    /// Collect every item of a paginated list action
    ///
    /// `build` turns a page cursor into a request; `extract` pulls the items
    /// out of a payload. A missing parent under [`NotFoundPolicy::Absent`]
    /// yields an empty list only when detected on the first page; absence on a
    /// later page fails with [`ConvergeError::NotFound`].
    pub async fn list_all<T, B, X>(
        &self,
        action: &str,
        profile: ProfileKind,
        not_found: NotFoundPolicy,
        build: B,
        extract: X,
    ) -> Result<Vec<T>>
    where
        B: Fn(PageRequest) -> Value,
        X: Fn(Value) -> Result<Vec<T>>,
    {
        self.list_filtered(action, profile, not_found, build, extract, |_: &T| true).await
    }

    /// [`list_all`](Self::list_all) keeping only items accepted by `filter`
    pub async fn list_filtered<T, B, X, P>(
        &self,
        action: &str,
        profile: ProfileKind,
        not_found: NotFoundPolicy,
        build: B,
        extract: X,
        filter: P,
    ) -> Result<Vec<T>>
    where
        B: Fn(PageRequest) -> Value,
        X: Fn(Value) -> Result<Vec<T>>,
        P: FnMut(&T) -> bool,
    {
        let (build, extract) = (&build, &extract);
        Paginator::new(self.page_size)?
            .collect_filtered(
                action,
                move |page| {
                    let request = build(page);
                    async move {
                        match self.call(action, &request, profile, not_found).await? {
                            Some(payload) => extract(payload).map(Some),
                            None if page.offset == 0 => Ok(Some(Vec::new())),
                            // Parent vanished mid-scan: the pages already read are stale.
                            None => {
                                warn!(action, offset = page.offset, "parent disappeared during scan");
                                Err(ConvergeError::NotFound {
                                    action: action.to_string(),
                                    request_id: None,
                                })
                            }
                        }
                    }
                },
                filter,
            )
            .await
    }
}
