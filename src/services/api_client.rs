// services/api_client.rs
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::errors::{value_as_string, MpesaError, Result};
use crate::services::auth::Authenticator;
use crate::services::http_client::{
    execute_with_retry, HttpRequest, ReqwestTransport, RetryPolicy, Transport,
};

/// Shared plumbing for every operation: config, transport and token cache.
pub struct ApiClient {
    config: Config,
    transport: Arc<dyn Transport>,
    auth: Arc<Authenticator>,
    policy: RetryPolicy,
}

impl ApiClient {
    pub fn new(config: Config) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        let auth = Arc::new(Authenticator::new(&config, transport.clone()));
        Self::with_parts(config, transport, auth)
    }

    pub fn with_parts(
        config: Config,
        transport: Arc<dyn Transport>,
        auth: Arc<Authenticator>,
    ) -> Self {
        ApiClient {
            policy: RetryPolicy::from_config(&config),
            config,
            transport,
            auth,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn auth(&self) -> &Authenticator {
        &self.auth
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url().trim_end_matches('/'), path)
    }

    /// POSTs `payload` with the bearer token attached and returns the raw JSON body.
    pub async fn post<T: Serialize>(&self, path: &str, payload: &T) -> Result<Value> {
        self.post_to(self.url(path), payload).await
    }

    /// POSTs to an absolute URL, for endpoints that carry their own query string.
    pub async fn post_to<T: Serialize>(&self, url: String, payload: &T) -> Result<Value> {
        let body = serde_json::to_value(payload)
            .map_err(|e| MpesaError::invalid_data(format!("Failed to encode request: {}", e)))?;
        let token = self.auth.token().await?;
        let request = HttpRequest::post(url, body)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json");

        // The query string may carry the api key.
        let endpoint = request.url.split('?').next().unwrap_or_default().to_string();
        info!("POST {}", endpoint);
        let response = execute_with_retry(self.transport.as_ref(), &request, self.policy).await?;
        debug!("Response from {}: {}", endpoint, response);
        Ok(response)
    }

    /// Like `post`, but a non-zero `ResponseCode` in the body becomes an API error.
    pub async fn post_checked<T: Serialize>(&self, path: &str, payload: &T) -> Result<Value> {
        let response = self.post(path, payload).await?;
        ensure_accepted(response)
    }
}

pub(crate) fn ensure_accepted(response: Value) -> Result<Value> {
    match response.get("ResponseCode").and_then(value_as_string) {
        Some(code) if code != "0" => {
            warn!("Gateway rejected request with ResponseCode {}", code);
            Err(MpesaError::from_response(response))
        }
        _ => Ok(response),
    }
}
