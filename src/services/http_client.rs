// services/http_client.rs
use async_trait::async_trait;
use rand::Rng;
use reqwest::{header, Client, Method};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::errors::{value_as_string, MpesaError, Result};

const MAX_BACKOFF_MS: u64 = 10_000;
const MAX_JITTER_MS: u64 = 1_000;

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        HttpRequest {
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        HttpRequest {
            method: Method::POST,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// One HTTP round trip. Implementations return `MpesaError::Network` when no
/// response was received at all.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout().max(1) as u64);
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!config.verify_ssl())
            .build()
            .map_err(|e| MpesaError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(ReqwestTransport { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .header(header::ACCEPT, "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| MpesaError::Network {
            message: e.to_string(),
            url: request.url.clone(),
        })?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| MpesaError::Network {
            message: e.to_string(),
            url: request.url.clone(),
        })?;

        Ok(HttpResponse { status, body })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        RetryPolicy {
            max_retries: config.max_retries().max(0) as u32,
            retry_delay_ms: config.retry_delay().max(0) as u64,
        }
    }

    /// Delay before retry `retry` (1-based), without jitter.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry.saturating_sub(1));
        let ms = self.retry_delay_ms.saturating_mul(factor).min(MAX_BACKOFF_MS);
        Duration::from_millis(ms)
    }

    fn jittered_delay(&self, retry: u32) -> Duration {
        let jitter = rand::rng().random_range(0..=MAX_JITTER_MS);
        self.backoff_delay(retry) + Duration::from_millis(jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: crate::config::DEFAULT_MAX_RETRIES as u32,
            retry_delay_ms: crate::config::DEFAULT_RETRY_DELAY_MS as u64,
        }
    }
}

/// Sends `request`, retrying 5xx, 429 and transport failures with exponential
/// backoff. Other 4xx responses and undecodable 2xx bodies fail at once.
pub async fn execute_with_retry(
    transport: &dyn Transport,
    request: &HttpRequest,
    policy: RetryPolicy,
) -> Result<Value> {
    let attempts = policy.max_retries + 1;
    let mut attempt = 1;

    loop {
        let err = match attempt_once(transport, request).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retryable() {
            error!("Request to {} failed: {}", request.url, err);
            return Err(err);
        }

        if attempt >= attempts {
            error!(
                "Giving up on {} after {} attempts: {}",
                request.url, attempts, err
            );
            return Err(MpesaError::RetriesExhausted {
                attempts,
                last: Box::new(err),
            });
        }

        let delay = policy.jittered_delay(attempt);
        warn!(
            "Attempt {}/{} to {} failed ({}), retrying in {:?}",
            attempt, attempts, request.url, err, delay
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

async fn attempt_once(transport: &dyn Transport, request: &HttpRequest) -> Result<Value> {
    debug!("{} {}", request.method, request.url);
    let response = transport.send(request).await?;

    if (200..300).contains(&response.status) {
        if response.body.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        return serde_json::from_str(&response.body)
            .map_err(|e| MpesaError::decode(e.to_string(), response.body.clone()));
    }

    Err(status_error(response))
}

fn status_error(response: HttpResponse) -> MpesaError {
    let parsed: Option<Value> = serde_json::from_str(&response.body).ok();
    let field = |keys: &[&str]| {
        parsed.as_ref().and_then(|body| {
            keys.iter()
                .find_map(|key| body.get(*key).and_then(value_as_string))
        })
    };

    let response_code = field(&["errorCode", "ResponseCode", "resultCode"]);
    let message = field(&["errorMessage", "ResponseDescription", "resultDesc"])
        .unwrap_or_else(|| format!("HTTP error {}", response.status));

    MpesaError::Api {
        status: Some(response.status),
        response_code,
        message,
        response: Some(parsed.unwrap_or(Value::String(response.body))),
    }
}
