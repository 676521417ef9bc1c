//! JSON-over-HTTP remote client
//!
//! Every action is a `POST` of the request body to a single endpoint, with the
//! action name in the `X-Action` header. Responses use the cloud envelope:
//!
//! ```json
//! {"Response": {"RequestId": "...", "Error": {"Code": "...", "Message": "..."}}}
//! ```
//!
//! An `Error` object becomes a [`RemoteError`]; anything else is the payload.
//! Request signing is left to a wrapping client or a proxy.

use std::time::Duration;

use async_trait::async_trait;
use convergent_core::RemoteClient;
use convergent_domain::constants::{ACTION_HEADER, DEFAULT_HTTP_TIMEOUT_MS};
use convergent_domain::{ConvergeError, EndpointConfig, RemoteError, Result};
use reqwest::header::HeaderMap;
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Response", default)]
    response: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    code: String,
    #[serde(default)]
    message: String,
}

/// [`RemoteClient`] posting JSON requests to one endpoint
#[derive(Debug, Clone)]
pub struct HttpRemoteClient {
    client: ReqwestClient,
    endpoint: Url,
}

impl HttpRemoteClient {
    /// Start building a new client.
    pub fn builder() -> HttpRemoteClientBuilder {
        HttpRemoteClientBuilder::default()
    }

    /// Client for the configured endpoint and timeout.
    pub fn from_config(config: &EndpointConfig) -> Result<Self> {
        Self::builder().endpoint(config.url.as_str()).timeout(config.timeout()).build()
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn invoke(
        &self,
        action: &str,
        request: &Value,
    ) -> std::result::Result<Option<Value>, RemoteError> {
        debug!(action, url = %self.endpoint, "sending remote request");

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(ACTION_HEADER, action)
            .json(request)
            .send()
            .await
            .map_err(|err| RemoteError::network(err.to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|err| RemoteError::network(err.to_string()))?;
        debug!(action, %status, bytes = body.len(), "received remote response");

        decode_response(status, &body)
    }
}

/// Map an HTTP status and body to the port's result
///
/// An envelope error wins over the HTTP status, so a 4xx carrying a proper
/// error code is classified by that code.
fn decode_response(
    status: reqwest::StatusCode,
    body: &str,
) -> std::result::Result<Option<Value>, RemoteError> {
    let envelope = serde_json::from_str::<Envelope>(body);

    if let Ok(Envelope { response: Some(payload) }) = &envelope {
        if let Some(error) = payload.get("Error") {
            let request_id = payload.get("RequestId").and_then(Value::as_str);
            return Err(decode_error(error, request_id));
        }
    }

    if !status.is_success() {
        return Err(RemoteError::http_status(status.as_u16(), body));
    }

    match envelope {
        Ok(Envelope { response: None | Some(Value::Null) }) => Ok(None),
        Ok(Envelope { response: payload }) => Ok(payload),
        Err(err) => Err(RemoteError::decode(format!("invalid response envelope: {err}"))),
    }
}

fn decode_error(error: &Value, request_id: Option<&str>) -> RemoteError {
    let decoded = match serde_json::from_value::<ErrorBody>(error.clone()) {
        Ok(body) => RemoteError::new(body.code, body.message),
        Err(err) => RemoteError::decode(format!("invalid error object {error}: {err}")),
    };

    match request_id {
        Some(id) => decoded.with_request_id(id),
        None => decoded,
    }
}

/// Builder for [`HttpRemoteClient`].
#[derive(Debug)]
pub struct HttpRemoteClientBuilder {
    endpoint: Option<String>,
    timeout: Duration,
    user_agent: Option<String>,
    default_headers: Option<HeaderMap>,
}

impl Default for HttpRemoteClientBuilder {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS),
            user_agent: None,
            default_headers: None,
        }
    }
}

impl HttpRemoteClientBuilder {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Headers sent with every request, for example credentials added by a
    /// signing proxy
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> Result<HttpRemoteClient> {
        let raw = self
            .endpoint
            .ok_or_else(|| ConvergeError::Config("http client requires an endpoint".into()))?;
        let endpoint = Url::parse(&raw)
            .map_err(|e| ConvergeError::Config(format!("Invalid endpoint url '{raw}': {e}")))?;

        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder
            .build()
            .map_err(|e| ConvergeError::Config(format!("Failed to build http client: {e}")))?;

        Ok(HttpRemoteClient { client, endpoint })
    }
}
