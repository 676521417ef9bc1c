//! Existence checks and settlement polling
//!
//! Helpers for the checks that surround a mutation: was the submission
//! accepted, does exactly one resource match, has a deleted resource gone
//! away, has a modified resource left its transitional state.
//!
//! `await_absent` and `await_settled` take a `probe` that performs one lookup
//! (usually a [`Gateway::call`](crate::Gateway::call) with
//! [`NotFoundPolicy::Absent`](convergent_domain::NotFoundPolicy::Absent)). Probe
//! errors end the wait immediately; only the resource's state drives polling.

use std::fmt;
use std::future::Future;

use convergent_common::resilience::{PollStep, RetryPoller, RetryProfile};
use convergent_domain::constants::ACCEPTED_RETURN_CODE;
use convergent_domain::{ConvergeError, Result};
use tracing::debug;

use crate::gateway::{map_retry_error, AttemptFailure, RetryTransient};

/// Check the synchronous result code of a write call
///
/// Only `"0"` means accepted. A missing code is treated as a rejection.
pub fn ensure_accepted(
    action: &str,
    return_code: Option<&str>,
    request_id: Option<&str>,
) -> Result<()> {
    match return_code {
        Some(ACCEPTED_RETURN_CODE) => Ok(()),
        other => Err(ConvergeError::contract(
            action,
            format!(
                "submission not accepted, return code {}{}",
                other.unwrap_or("<missing>"),
                request_id.map(|id| format!(" (request id: {id})")).unwrap_or_default()
            ),
        )),
    }
}

/// At most one match expected: none is absence, more is a contract violation
pub fn find_exactly_one<T>(action: &str, items: Vec<T>) -> Result<Option<T>> {
    let count = items.len();
    let mut items = items.into_iter();
    match (items.next(), count) {
        (None, _) => Ok(None),
        (Some(item), 1) => Ok(Some(item)),
        (Some(_), _) => Err(ConvergeError::contract(
            action,
            format!("duplicated results: expected at most one, found {count}"),
        )),
    }
}

/// Poll until `probe` reports the resource gone
///
/// A resource still present in a transitional state (for example
/// "deleting") keeps the poll going; present in any other state is
/// `InvalidState`.
pub async fn await_absent<T, F, Fut, Tr>(
    action: &str,
    profile: RetryProfile,
    mut probe: F,
    is_transitional: Tr,
) -> Result<()>
where
    T: fmt::Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
    Tr: Fn(&T) -> bool,
{
    let is_transitional = &is_transitional;

    RetryPoller::new(profile)
        .run(&RetryTransient, move || {
            let lookup = probe();
            async move {
                match lookup.await? {
                    None => Ok(PollStep::Ready(())),
                    Some(resource) if is_transitional(&resource) => {
                        debug!(action, ?resource, "still present, waiting for removal");
                        Ok(PollStep::Pending(format!("{action}: resource still present")))
                    }
                    Some(resource) => Err(AttemptFailure::Terminal(ConvergeError::InvalidState {
                        action: action.to_string(),
                        detail: format!("resource still present and not transitioning: {resource:?}"),
                    })),
                }
            }
        })
        .await
        .map_err(|error| map_retry_error(action, error))
}

/// Poll until `probe` reports the resource outside its transitional states
/// and return it
///
/// Absence is `NotFound`.
pub async fn await_settled<T, F, Fut, Tr>(
    action: &str,
    profile: RetryProfile,
    mut probe: F,
    is_transitional: Tr,
) -> Result<T>
where
    T: fmt::Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
    Tr: Fn(&T) -> bool,
{
    let is_transitional = &is_transitional;

    RetryPoller::new(profile)
        .run(&RetryTransient, move || {
            let lookup = probe();
            async move {
                match lookup.await? {
                    None => Err(AttemptFailure::Terminal(ConvergeError::NotFound {
                        action: action.to_string(),
                        request_id: None,
                    })),
                    Some(resource) if is_transitional(&resource) => {
                        debug!(action, ?resource, "resource still transitioning");
                        Ok(PollStep::Pending(format!("{action}: resource still transitioning")))
                    }
                    Some(resource) => Ok(PollStep::Ready(resource)),
                }
            }
        })
        .await
        .map_err(|error| map_retry_error(action, error))
}
