// services/auth.rs
use base64::{engine::general_purpose::STANDARD as base64, Engine as _};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::config::Config;
use crate::errors::{value_as_string, AuthErrorKind, MpesaError, Result};
use crate::services::http_client::{execute_with_retry, HttpRequest, RetryPolicy, Transport};

pub const TOKEN_PATH: &str = "/v1/token/generate?grant_type=client_credentials";
const DEFAULT_EXPIRES_IN: i64 = 3599;
// Gateway-supplied lifetimes are capped so the expiry stays representable.
const MAX_EXPIRES_IN: i64 = i32::MAX as i64;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct AuthToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Client-credentials exchange with a per-instance token cache.
pub struct Authenticator {
    base_url: String,
    consumer_key: String,
    consumer_secret: String,
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    auto_authenticate: AtomicBool,
    token: Mutex<Option<AuthToken>>,
    clock: Clock,
}

impl Authenticator {
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Self {
        Authenticator {
            base_url: config.base_url().trim_end_matches('/').to_string(),
            consumer_key: config.consumer_key().to_string(),
            consumer_secret: config.consumer_secret().to_string(),
            transport,
            policy: RetryPolicy::from_config(config),
            auto_authenticate: AtomicBool::new(true),
            token: Mutex::new(None),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn set_auto_authenticate(&self, enabled: bool) {
        self.auto_authenticate.store(enabled, Ordering::Relaxed);
    }

    pub fn auto_authenticate(&self) -> bool {
        self.auto_authenticate.load(Ordering::Relaxed)
    }

    /// Returns the cached token while it is valid, otherwise fetches a new one.
    pub async fn authenticate(&self) -> Result<AuthToken> {
        let mut cached = self.token.lock().await;
        let now = (self.clock)();
        if let Some(token) = cached.as_ref() {
            if !token.is_expired_at(now) {
                return Ok(token.clone());
            }
            info!("Access token expired, requesting a new one");
        }

        let token = self.request_token().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Bearer value for outbound calls. Refreshes transparently unless
    /// auto-authentication was switched off.
    pub async fn token(&self) -> Result<String> {
        if self.auto_authenticate() {
            return self.authenticate().await.map(|t| t.access_token);
        }
        self.token
            .lock()
            .await
            .as_ref()
            .map(|t| t.access_token.clone())
            .ok_or(MpesaError::NotAuthenticated)
    }

    pub async fn has_token(&self) -> bool {
        self.token.lock().await.is_some()
    }

    pub async fn is_expired(&self) -> bool {
        match self.token.lock().await.as_ref() {
            Some(token) => token.is_expired_at((self.clock)()),
            None => true,
        }
    }

    pub async fn token_type(&self) -> Option<String> {
        self.token.lock().await.as_ref().map(|t| t.token_type.clone())
    }

    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.token.lock().await.as_ref().map(|t| t.expires_at)
    }

    async fn request_token(&self) -> Result<AuthToken> {
        info!("Requesting new access token");
        let credentials =
            base64.encode(format!("{}:{}", self.consumer_key, self.consumer_secret));
        let request = HttpRequest::get(format!("{}{}", self.base_url, TOKEN_PATH))
            .header("Authorization", format!("Basic {}", credentials));

        let body = execute_with_retry(self.transport.as_ref(), &request, self.policy)
            .await
            .map_err(classify_failure)?;

        let token = self.parse_token(body)?;
        info!("Access token obtained, expires at {}", token.expires_at);
        Ok(token)
    }

    fn parse_token(&self, body: Value) -> Result<AuthToken> {
        let access_token = match body.get("access_token").and_then(value_as_string) {
            Some(token) if !token.is_empty() => token,
            _ => {
                if let Some(err) = known_code_error(&body) {
                    return Err(err);
                }
                error!("Token response carried no access_token");
                return Err(MpesaError::Authentication {
                    kind: AuthErrorKind::MissingAccessToken,
                    message: "Access token not found in response".to_string(),
                    code: None,
                    response: Some(body),
                });
            }
        };

        let expires_in = body
            .get("expires_in")
            .and_then(value_as_string)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(|secs| secs.clamp(0, MAX_EXPIRES_IN))
            .unwrap_or(DEFAULT_EXPIRES_IN);
        let token_type = body
            .get("token_type")
            .and_then(value_as_string)
            .unwrap_or_else(|| "Bearer".to_string());

        let now = (self.clock)();
        let expires_at = expiry_after(now, expires_in)
            .or_else(|| expiry_after(now, DEFAULT_EXPIRES_IN))
            .unwrap_or(now);

        Ok(AuthToken {
            access_token,
            token_type,
            expires_at,
        })
    }
}

fn expiry_after(now: DateTime<Utc>, seconds: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(seconds).and_then(|ttl| now.checked_add_signed(ttl))
}

fn known_code_error(body: &Value) -> Option<MpesaError> {
    let code = body
        .get("resultCode")
        .or_else(|| body.get("errorCode"))
        .and_then(value_as_string)?;
    let (kind, message) = AuthErrorKind::from_code(&code)?;
    Some(MpesaError::Authentication {
        kind,
        message: message.to_string(),
        code: Some(code),
        response: Some(body.clone()),
    })
}

fn classify_failure(err: MpesaError) -> MpesaError {
    match err {
        MpesaError::RetriesExhausted { attempts, last } => match classify_failure(*last) {
            MpesaError::Authentication {
                kind,
                message,
                code,
                response,
            } => MpesaError::Authentication {
                kind,
                message: format!("{} (after {} attempts)", message, attempts),
                code,
                response,
            },
            other => other,
        },
        MpesaError::Network { message, url } => MpesaError::Authentication {
            kind: AuthErrorKind::Network,
            message: format!("Network error while authenticating against {}: {}", url, message),
            code: None,
            response: None,
        },
        MpesaError::Api {
            response_code,
            message,
            response,
            ..
        } => {
            if let Some(err) = response.as_ref().and_then(known_code_error) {
                return err;
            }
            MpesaError::Authentication {
                kind: AuthErrorKind::Rejected,
                message,
                code: response_code,
                response,
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn auth_codes_in_error_bodies_are_classified() {
        let err = classify_failure(MpesaError::Api {
            status: Some(400),
            response_code: Some("999991".into()),
            message: "Invalid client id passed".into(),
            response: Some(json!({
                "resultCode": "999991",
                "resultDesc": "Invalid client id passed"
            })),
        });
        match err {
            MpesaError::Authentication { kind, code, .. } => {
                assert_eq!(kind, AuthErrorKind::InvalidClientId);
                assert_eq!(code.as_deref(), Some("999991"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_codes_keep_gateway_message() {
        let err = classify_failure(MpesaError::Api {
            status: Some(401),
            response_code: Some("401.003.01".into()),
            message: "Error Occurred - Invalid Access Token".into(),
            response: Some(json!({"errorCode": "401.003.01"})),
        });
        assert!(matches!(
            err,
            MpesaError::Authentication { kind: AuthErrorKind::Rejected, ref message, .. }
                if message == "Error Occurred - Invalid Access Token"
        ));
    }

    #[test]
    fn network_failures_wrap_uniformly() {
        let err = classify_failure(MpesaError::RetriesExhausted {
            attempts: 4,
            last: Box::new(MpesaError::Network {
                message: "connection refused".into(),
                url: "https://apisandbox.safaricom.et".into(),
            }),
        });
        assert!(matches!(
            err,
            MpesaError::Authentication { kind: AuthErrorKind::Network, ref message, .. }
                if message.ends_with("(after 4 attempts)")
        ));
    }

    #[test]
    fn expiry_overflow_is_reported_as_none() {
        let now = Utc::now();
        assert!(expiry_after(now, i64::MAX).is_none());
        assert!(expiry_after(DateTime::<Utc>::MAX_UTC, 60).is_none());
        assert_eq!(expiry_after(now, 60), Some(now + Duration::seconds(60)));
    }
}
