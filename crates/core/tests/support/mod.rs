//! Shared test helpers for `convergent-core` integration tests.
//!
//! `ScriptedRemote` is an in-memory `RemoteClient` that replays a scripted
//! sequence of outcomes per action and records every request it receives.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use convergent_common::resilience::{RateLimiter, RateLimiterConfig};
use convergent_core::{CodeTableClassifier, Gateway, RemoteClient};
use convergent_domain::{ClassifierConfig, RemoteError};
use parking_lot::Mutex;
use serde_json::Value;

pub type Outcome = Result<Option<Value>, RemoteError>;

#[derive(Default)]
struct ActionScript {
    queue: VecDeque<Outcome>,
    /// Replayed once the queue is drained
    last: Option<Outcome>,
    requests: Vec<Value>,
}

/// Remote client replaying scripted outcomes
#[derive(Default)]
pub struct ScriptedRemote {
    scripts: Mutex<HashMap<String, ActionScript>>,
}

impl ScriptedRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue outcomes for `action`; the final one repeats forever
    pub fn script(&self, action: &str, outcomes: impl IntoIterator<Item = Outcome>) {
        let mut scripts = self.scripts.lock();
        scripts.entry(action.to_string()).or_default().queue.extend(outcomes);
    }

    pub fn calls(&self, action: &str) -> usize {
        self.scripts.lock().get(action).map_or(0, |s| s.requests.len())
    }

    pub fn requests(&self, action: &str) -> Vec<Value> {
        self.scripts.lock().get(action).map(|s| s.requests.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl RemoteClient for ScriptedRemote {
    async fn invoke(&self, action: &str, request: &Value) -> Outcome {
        let mut scripts = self.scripts.lock();
        let script = scripts.entry(action.to_string()).or_default();
        script.requests.push(request.clone());

        match script.queue.pop_front() {
            Some(outcome) => {
                script.last = Some(outcome.clone());
                outcome
            }
            None => script.last.clone().unwrap_or_else(|| {
                Err(RemoteError::new("UnscriptedAction", format!("no script for {action}")))
            }),
        }
    }
}

pub fn ok(payload: Value) -> Outcome {
    Ok(Some(payload))
}

pub fn remote_err(code: &str) -> Outcome {
    Err(RemoteError::new(code, "scripted failure").with_request_id(format!("req-{code}")))
}

/// Gateway over `remote` with the recommended classifier and a generous
/// rate budget
pub fn gateway(remote: Arc<ScriptedRemote>) -> Gateway {
    let limiter = RateLimiter::new(RateLimiterConfig { default_budget: 1_000, ..Default::default() })
        .expect("valid limiter");
    Gateway::new(
        remote,
        Arc::new(limiter),
        Arc::new(CodeTableClassifier::from_config(&ClassifierConfig::recommended())),
    )
}
