use std::sync::Arc;

use convergent_common::resilience::{PollStep, ProfileKind, RetryPoller};
use convergent_domain::{
    AsyncHandle, ConvergeError, NotFoundPolicy, OrderRef, PollOutcome, Result, StatusTable,
    Submission,
};
use tracing::{debug, error, info, instrument};

use super::protocol::{JsonTaskProtocol, TaskProtocol};
use crate::gateway::{map_retry_error, AttemptFailure, Gateway, RetryTransient};

/// An order resolved to its single resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOrder {
    pub resource_id: String,
    pub handle: Option<AsyncHandle>,
}

/// Turns a submission into a blocking call that returns once the remote task
/// is terminal
///
/// Holds no state between invocations; one instance can serve any number of
/// concurrent submissions.
pub struct ConvergenceWorkflow<P: TaskProtocol = JsonTaskProtocol> {
    gateway: Arc<Gateway>,
    protocol: P,
}

impl ConvergenceWorkflow<JsonTaskProtocol> {
    /// Workflow using the flow-status protocol
    pub fn flow(gateway: Arc<Gateway>) -> Self {
        Self::new(gateway, JsonTaskProtocol::flow_default())
    }
}

impl<P: TaskProtocol> ConvergenceWorkflow<P> {
    pub const fn new(gateway: Arc<Gateway>, protocol: P) -> Self {
        Self { gateway, protocol }
    }

    pub const fn protocol(&self) -> &P {
        &self.protocol
    }

    /// Drive `submission` to completion
    ///
    /// Returns the resource id the submission produced, if it has one.
    /// `not_found` decides what an absent task means while polling: with
    /// [`NotFoundPolicy::Absent`] the task is considered finished.
    #[instrument(skip_all, fields(status_action = %self.protocol.status_action()))]
    pub async fn await_completion(
        &self,
        submission: Submission,
        table: &StatusTable,
        not_found: NotFoundPolicy,
    ) -> Result<Option<String>> {
        let resource_id = match submission {
            Submission::Completed { resource_id } => {
                debug!("submission completed synchronously");
                resource_id
            }
            Submission::Task { handle, resource_id } => {
                self.await_task(&handle, table, not_found).await?;
                resource_id
            }
            Submission::Order(order) => {
                let resolved = self.resolve_order(&order).await?;
                if let Some(handle) = &resolved.handle {
                    self.await_task(handle, table, not_found).await?;
                }
                Some(resolved.resource_id)
            }
        };

        info!(resource_id = resource_id.as_deref().unwrap_or(""), "submission converged");
        Ok(resource_id)
    }

    /// Map an order to exactly one resource id and its provisioning handle
    pub async fn resolve_order(&self, order: &OrderRef) -> Result<ResolvedOrder> {
        let action = self.protocol.order_action();
        let request = self.protocol.order_request(order);
        let response = self
            .gateway
            .call(action, &request, ProfileKind::ShortRead, NotFoundPolicy::Fatal)
            .await?
            .ok_or_else(|| ConvergeError::contract(action, "empty response"))?;

        let mut orders = self.protocol.read_orders(&response)?;
        if orders.len() != 1 {
            return Err(ConvergeError::contract(
                action,
                format!("expected exactly one order for {order}, found {}", orders.len()),
            ));
        }
        let resolution = orders.remove(0);

        let [resource_id] = <[String; 1]>::try_from(resolution.resource_ids).map_err(|ids| {
            ConvergeError::contract(
                action,
                format!("expected exactly one resource for {order}, found {}", ids.len()),
            )
        })?;

        debug!(%order, resource_id = %resource_id, "order resolved");
        Ok(ResolvedOrder { resource_id, handle: resolution.handle })
    }

    /// Poll the task behind `handle` until `table` maps its status to a
    /// terminal state
    ///
    /// A null handle has nothing to wait for.
    pub async fn await_task(
        &self,
        handle: &AsyncHandle,
        table: &StatusTable,
        not_found: NotFoundPolicy,
    ) -> Result<()> {
        if handle.is_null() {
            debug!(%handle, "null task handle, nothing to poll");
            return Ok(());
        }

        let action = self.protocol.status_action();
        let request = self.protocol.status_request(handle);
        let (gateway, protocol, request) = (&self.gateway, &self.protocol, &request);

        RetryPoller::new(gateway.profile(ProfileKind::LongConverge))
            .run(&RetryTransient, move || async move {
                let Some(response) = gateway.attempt(action, request, not_found).await? else {
                    debug!(%handle, "task no longer exists, treating as finished");
                    return Ok(PollStep::Ready(()));
                };

                let report = protocol.read_status(&response)?;
                match table.outcome(&report.code) {
                    PollOutcome::Pending => Ok(PollStep::Pending(format!(
                        "task {handle} status {}",
                        report.code
                    ))),
                    PollOutcome::Succeeded => Ok(PollStep::Ready(())),
                    PollOutcome::Failed(status) => {
                        error!(%handle, %status, "task failed");
                        Err(AttemptFailure::Terminal(ConvergeError::TaskFailed {
                            action: action.to_string(),
                            status,
                            request_id: report.request_id,
                        }))
                    }
                }
            })
            .await
            .map_err(|error| map_retry_error(action, error))
    }
}
