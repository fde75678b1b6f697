#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use mpesa_sdk::services::{Clock, HttpRequest, HttpResponse, Transport};
use mpesa_sdk::{Config, MpesaError, Result};

pub const TOKEN_BODY: &str =
    r#"{"access_token":"test-token","token_type":"Bearer","expires_in":"3599"}"#;

#[derive(Debug, Clone)]
pub enum Reply {
    Http(u16, String),
    NetworkDown,
}

impl Reply {
    pub fn ok(body: &str) -> Self {
        Reply::Http(200, body.to_string())
    }

    pub fn status(status: u16, body: &str) -> Self {
        Reply::Http(status, body.to_string())
    }
}

/// Scripted in-memory transport. Token requests and API requests have
/// separate queues; when a queue runs dry its fallback reply is used.
pub struct MockTransport {
    token_replies: Mutex<VecDeque<Reply>>,
    api_replies: Mutex<VecDeque<Reply>>,
    token_fallback: Mutex<Reply>,
    api_fallback: Mutex<Reply>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(MockTransport {
            token_replies: Mutex::new(VecDeque::new()),
            api_replies: Mutex::new(VecDeque::new()),
            token_fallback: Mutex::new(Reply::ok(TOKEN_BODY)),
            api_fallback: Mutex::new(Reply::ok(
                r#"{"ResponseCode":"0","ResponseDescription":"Success"}"#,
            )),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn push_token(&self, reply: Reply) {
        self.token_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_api(&self, reply: Reply) {
        self.api_replies.lock().unwrap().push_back(reply);
    }

    pub fn always_token(&self, reply: Reply) {
        *self.token_fallback.lock().unwrap() = reply;
    }

    pub fn always_api(&self, reply: Reply) {
        *self.api_fallback.lock().unwrap() = reply;
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn token_requests(&self) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| is_token_request(r))
            .collect()
    }

    pub fn api_requests(&self) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| !is_token_request(r))
            .collect()
    }

    pub fn last_api_body(&self) -> Value {
        self.api_requests()
            .last()
            .and_then(|r| r.body.clone())
            .expect("no API request recorded")
    }
}

fn is_token_request(request: &HttpRequest) -> bool {
    request.url.contains("/v1/token/generate")
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());

        let reply = if is_token_request(request) {
            let next = self.token_replies.lock().unwrap().pop_front();
            next.unwrap_or_else(|| self.token_fallback.lock().unwrap().clone())
        } else {
            let next = self.api_replies.lock().unwrap().pop_front();
            next.unwrap_or_else(|| self.api_fallback.lock().unwrap().clone())
        };

        match reply {
            Reply::Http(status, body) => Ok(HttpResponse { status, body }),
            Reply::NetworkDown => Err(MpesaError::Network {
                message: "connection refused".to_string(),
                url: request.url.clone(),
            }),
        }
    }
}

pub fn test_config() -> Config {
    let mut config = Config::new("consumer-key", "consumer-secret", "pass", "174379");
    config.set_retry_config(3, 100);
    config
}

/// Clock whose current time tests can move by hand.
#[derive(Clone)]
pub struct ManualClock(Arc<Mutex<DateTime<Utc>>>);

impl ManualClock {
    pub fn new() -> Self {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        ManualClock(Arc::new(Mutex::new(start)))
    }

    pub fn advance(&self, seconds: i64) {
        let mut now = self.0.lock().unwrap();
        *now += chrono::Duration::seconds(seconds);
    }

    pub fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }

    pub fn clock(&self) -> Clock {
        let inner = self.0.clone();
        Arc::new(move || *inner.lock().unwrap())
    }
}
