// src/errors.rs
use serde_json::Value;
use thiserror::Error;

/// Why a token request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    InvalidClientId,
    InvalidAuthHeader,
    MissingAuthHeader,
    InvalidToken,
    MissingAccessToken,
    Network,
    Rejected,
}

impl AuthErrorKind {
    /// Maps the numeric codes the token endpoint returns to a kind and a readable message.
    pub fn from_code(code: &str) -> Option<(Self, &'static str)> {
        match code {
            "999991" => Some((Self::InvalidClientId, "Invalid client id passed")),
            "999996" => Some((
                Self::InvalidAuthHeader,
                "Invalid authentication header format",
            )),
            "999997" => Some((
                Self::MissingAuthHeader,
                "Authorization header is missing or invalid",
            )),
            "999998" => Some((Self::InvalidToken, "Access token is invalid or has expired")),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum MpesaError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No access token available. Call authenticate() first.")]
    NotAuthenticated,

    #[error("Authentication failed: {message}")]
    Authentication {
        kind: AuthErrorKind,
        message: String,
        code: Option<String>,
        response: Option<Value>,
    },

    #[error("Network error calling {url}: {message}")]
    Network { message: String, url: String },

    #[error("{}", api_message(.message, .response_code.as_deref()))]
    Api {
        status: Option<u16>,
        response_code: Option<String>,
        message: String,
        response: Option<Value>,
    },

    #[error("Invalid JSON response: {message}")]
    Decode { message: String, body: String },

    #[error("Max retries exceeded after {attempts} attempts. Last error: {last}")]
    RetriesExhausted { attempts: u32, last: Box<MpesaError> },

    #[error("Configuration error: {0}")]
    Config(String),
}

const RESPONSE_CODES: &[(&str, &str)] = &[
    ("0", "Success"),
    ("1", "Insufficient Funds"),
    ("2", "Less Than Minimum Transaction Value"),
    ("3", "More Than Maximum Transaction Value"),
    ("4", "Would Exceed Daily Transfer Limit"),
    ("5", "Would Exceed Minimum Balance"),
    ("6", "Unresolved Primary Party"),
    ("7", "Unresolved Receiver Party"),
    ("8", "Would Exceed Maximum Balance"),
    ("11", "Debit Account Invalid"),
    ("12", "Credit Account Invalid"),
    ("13", "Unresolved Debit Account"),
    ("14", "Unresolved Credit Account"),
    ("15", "Duplicate Detected"),
    ("17", "Internal Failure"),
    ("20", "Unresolved Initiator"),
    ("26", "Traffic blocking condition in place"),
    ("1001", "Invalid credentials"),
    ("1002", "Invalid application"),
    ("1003", "Invalid request"),
    ("1004", "Invalid operation type"),
    ("1005", "Invalid merchant"),
    ("1006", "Invalid debit party"),
    ("1007", "Invalid credit party"),
    ("1008", "Invalid currency"),
    ("1009", "Invalid amount"),
    ("1010", "Invalid metadata"),
    ("1011", "Invalid customer number"),
    ("1012", "Invalid reference"),
    ("1013", "Invalid callback URL"),
    ("1014", "Invalid request type"),
];

/// Looks up the gateway's description for a business response code.
pub fn describe_response_code(code: &str) -> Option<&'static str> {
    RESPONSE_CODES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, description)| *description)
}

fn api_message(message: &str, code: Option<&str>) -> String {
    match code.and_then(|c| describe_response_code(c).map(|d| (c, d))) {
        Some((code, description)) => {
            format!("{} (Response Code {}: {})", message, code, description)
        }
        None => message.to_string(),
    }
}

impl From<validator::ValidationErrors> for MpesaError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();
        MpesaError::Validation(messages.join(", "))
    }
}

impl From<reqwest::Error> for MpesaError {
    fn from(err: reqwest::Error) -> Self {
        let url = err.url().map(|u| u.to_string()).unwrap_or_default();
        MpesaError::Network {
            message: err.to_string(),
            url,
        }
    }
}

// Helper conversion functions
impl MpesaError {
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        MpesaError::Validation(msg.into())
    }

    pub fn decode(msg: impl Into<String>, body: impl Into<String>) -> Self {
        MpesaError::Decode {
            message: msg.into(),
            body: body.into(),
        }
    }

    /// Builds an API error from a gateway body that carries a non-zero `ResponseCode`.
    pub fn from_response(response: Value) -> Self {
        let response_code = response
            .get("ResponseCode")
            .or_else(|| response.get("errorCode"))
            .and_then(value_as_string);
        let message = response
            .get("errorMessage")
            .or_else(|| response.get("ResponseDescription"))
            .and_then(value_as_string)
            .unwrap_or_else(|| "M-Pesa API Error".to_string());

        MpesaError::Api {
            status: None,
            response_code,
            message,
            response: Some(response),
        }
    }

    pub fn response_code(&self) -> Option<&str> {
        match self {
            MpesaError::Api { response_code, .. } => response_code.as_deref(),
            MpesaError::Authentication { code, .. } => code.as_deref(),
            MpesaError::RetriesExhausted { last, .. } => last.response_code(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            MpesaError::Api { status, .. } => *status,
            MpesaError::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    pub fn response(&self) -> Option<&Value> {
        match self {
            MpesaError::Api { response, .. } => response.as_ref(),
            MpesaError::Authentication { response, .. } => response.as_ref(),
            MpesaError::RetriesExhausted { last, .. } => last.response(),
            _ => None,
        }
    }

    /// Transport failures, 5xx and 429 are worth another attempt; everything else is terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            MpesaError::Network { .. } => true,
            MpesaError::Api {
                status: Some(status),
                ..
            } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    pub fn is_error_code(&self, code: &str) -> bool {
        self.response_code() == Some(code)
    }

    pub fn is_insufficient_funds(&self) -> bool {
        self.is_error_code("1")
    }

    pub fn is_invalid_credentials(&self) -> bool {
        self.is_error_code("1001")
    }

    pub fn is_duplicate_transaction(&self) -> bool {
        self.is_error_code("15")
    }
}

/// Gateway payloads mix numeric and string codes; normalize both to a string.
pub(crate) fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub type Result<T> = std::result::Result<T, MpesaError>;
