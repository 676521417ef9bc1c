//! Wiring configuration into a ready engine
//!
//! ```no_run
//! # async fn run() -> convergent_domain::Result<()> {
//! use convergent_domain::{NotFoundPolicy, StatusTable, Submission};
//! use convergent_infra::EngineBuilder;
//!
//! let engine = EngineBuilder::from_sources()?.build()?;
//! let instance = engine
//!     .workflow()
//!     .await_completion(
//!         Submission::order("deal-1"),
//!         &StatusTable::flow_default(),
//!         NotFoundPolicy::Fatal,
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use convergent_common::error::ErrorClassifier;
use convergent_common::resilience::RateLimiter;
use convergent_core::settings::{rate_limiter_config, retry_profiles};
use convergent_core::{CodeTableClassifier, ConvergenceWorkflow, Gateway, RemoteClient, TaskProtocol};
use convergent_domain::{ConvergeError, EngineConfig, RemoteError, Result};
use tracing::info;

use crate::config;
use crate::remote::HttpRemoteClient;

/// Builds a [`Engine`] from an [`EngineConfig`]
///
/// Without an explicit client, the HTTP client for `config.endpoint` is used.
/// Without an explicit classifier, the configured code tables are used.
pub struct EngineBuilder {
    config: EngineConfig,
    client: Option<Arc<dyn RemoteClient>>,
    classifier: Option<Arc<dyn ErrorClassifier<RemoteError>>>,
}

impl EngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self { config, client: None, classifier: None }
    }

    /// Builder over [`config::load`]
    pub fn from_sources() -> Result<Self> {
        Ok(Self::new(config::load()?))
    }

    pub fn with_client(mut self, client: Arc<dyn RemoteClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier<RemoteError>>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn build(self) -> Result<Engine> {
        self.config.validate()?;

        let client = match (self.client, &self.config.endpoint) {
            (Some(client), _) => client,
            (None, Some(endpoint)) => Arc::new(HttpRemoteClient::from_config(endpoint)?),
            (None, None) => {
                return Err(ConvergeError::Config(
                    "no remote client: configure an endpoint or supply a client".into(),
                ))
            }
        };

        let classifier = self.classifier.unwrap_or_else(|| {
            Arc::new(CodeTableClassifier::from_config(&self.config.classifier))
        });

        let limiter = RateLimiter::new(rate_limiter_config(&self.config.rate_limit))
            .map_err(ConvergeError::Config)?;

        let gateway = Gateway::new(client, Arc::new(limiter), classifier)
            .with_profiles(retry_profiles(&self.config.retry))
            .with_page_size(self.config.pagination.page_size)?;
        let gateway = Arc::new(gateway);

        info!(
            default_budget = self.config.rate_limit.default_budget,
            overrides = self.config.rate_limit.overrides.len(),
            page_size = self.config.pagination.page_size,
            "engine ready"
        );

        Ok(Engine {
            workflow: ConvergenceWorkflow::flow(Arc::clone(&gateway)),
            gateway,
            config: self.config,
        })
    }
}

impl fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("config", &self.config)
            .field("custom_client", &self.client.is_some())
            .field("custom_classifier", &self.classifier.is_some())
            .finish()
    }
}

/// A gateway and flow-status workflow sharing one rate limiter
pub struct Engine {
    gateway: Arc<Gateway>,
    workflow: ConvergenceWorkflow,
    config: EngineConfig,
}

impl Engine {
    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    pub fn workflow(&self) -> &ConvergenceWorkflow {
        &self.workflow
    }

    /// Workflow over the same gateway with a different task protocol
    pub fn workflow_with<P: TaskProtocol>(&self, protocol: P) -> ConvergenceWorkflow<P> {
        ConvergenceWorkflow::new(Arc::clone(&self.gateway), protocol)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine").field("gateway", &self.gateway).finish_non_exhaustive()
    }
}
