//! Classifier service client: the async seam plus the HTTP implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ClientError;

/// Local development worker; real runs set `endpoint` in the config.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8787/chat";
pub const DEFAULT_TENANT: &str = "tiktak_pro";
pub const USER_AGENT: &str = "TikTak-TestHarness/4.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One prior turn of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Turn {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Turn {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Request body for the `/chat` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<Turn>,
    pub tenant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
}

impl ChatRequest {
    /// Reject bodies the service would refuse outright.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.message.trim().is_empty() {
            return Err(ClientError::InvalidRequest("message is empty".into()));
        }
        if self.tenant_id.trim().is_empty() {
            return Err(ClientError::InvalidRequest("tenant_id is empty".into()));
        }
        Ok(())
    }
}

/// Raw reply: the decoded JSON body and the measured round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceReply {
    pub body: Value,
    pub latency_ms: u64,
}

/// Anything that can answer a chat request. The harness only talks to
/// the service through this trait.
#[async_trait]
pub trait ClassifierClient: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ServiceReply, ClientError>;
}

// ── Retry ────────────────────────────────────────────────────────────────────

/// Bounded retry: fixed delay for transport errors and 5xx, a delay that
/// grows with the attempt number for 429.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub rate_limit_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            retry_delay: Duration::from_millis(3000),
            rate_limit_delay: Duration::from_millis(8000),
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts,
            retry_delay: Duration::ZERO,
            rate_limit_delay: Duration::ZERO,
        }
    }
}

/// Run `op` until it succeeds, fails permanently, or the attempt budget
/// is spent.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last = ClientError::Transport("no attempt made".into());

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(ClientError::RateLimited) => {
                if attempt < attempts {
                    let delay = policy.rate_limit_delay * attempt;
                    warn!(
                        attempt,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                last = ClientError::RateLimited;
            }
            Err(e) if e.is_transient() => {
                if attempt < attempts {
                    warn!(
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "transient error, retrying"
                    );
                    tokio::time::sleep(policy.retry_delay).await;
                }
                last = e;
            }
            Err(e) => return Err(e),
        }
    }

    Err(ClientError::RetriesExhausted {
        attempts,
        last: Box::new(last),
    })
}

/// Endpoint with the debug flag appended when requested.
pub fn request_url(endpoint: &str, debug: bool) -> String {
    if !debug {
        return endpoint.to_string();
    }
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!("{endpoint}{separator}debug=1")
}

// ── HTTP implementation ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub endpoint: String,
    pub debug: bool,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        HttpClientConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            debug: true,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// Blocking `ureq` agent driven from `spawn_blocking`, wrapped in
/// [`with_retry`].
#[cfg(feature = "http")]
pub struct HttpClassifierClient {
    agent: ureq::Agent,
    url: String,
    retry: RetryPolicy,
}

#[cfg(feature = "http")]
impl HttpClassifierClient {
    pub fn new(config: HttpClientConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .build()
            .into();
        HttpClassifierClient {
            agent,
            url: request_url(&config.endpoint, config.debug),
            retry: config.retry,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post_once(&self, body: Value) -> Result<ServiceReply, ClientError> {
        let agent = self.agent.clone();
        let url = self.url.clone();

        // ureq is synchronous, so wrap in spawn_blocking
        tokio::task::spawn_blocking(move || -> Result<ServiceReply, ClientError> {
            let started = std::time::Instant::now();
            let response = agent
                .post(&url)
                .header("Content-Type", "application/json")
                .header("Accept", "application/json")
                .header("User-Agent", USER_AGENT)
                .send_json(&body)
                .map_err(map_ureq_error)?;
            let body: Value = response
                .into_body()
                .read_json()
                .map_err(|e| ClientError::Decode(e.to_string()))?;
            Ok(ServiceReply {
                body,
                latency_ms: started.elapsed().as_millis() as u64,
            })
        })
        .await
        .map_err(|e| ClientError::Transport(format!("task join error: {e}")))?
    }
}

#[cfg(feature = "http")]
fn map_ureq_error(e: ureq::Error) -> ClientError {
    match e {
        ureq::Error::StatusCode(429) => ClientError::RateLimited,
        ureq::Error::StatusCode(code) => ClientError::Status(code),
        other => ClientError::Transport(other.to_string()),
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl ClassifierClient for HttpClassifierClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ServiceReply, ClientError> {
        request.validate()?;
        let body =
            serde_json::to_value(request).map_err(|e| ClientError::InvalidRequest(e.to_string()))?;
        debug!(url = %self.url, history = request.history.len(), "posting chat request");
        with_retry(&self.retry, move || self.post_once(body.clone())).await
    }
}
