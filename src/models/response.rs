// models/response.rs
use serde::Serialize;
use serde_json::{Map, Value};
use std::ops::Deref;

use crate::errors::value_as_string;

/// Read-only view over a gateway JSON response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ApiResponse {
    raw: Value,
}

pub type StkPushResponse = ApiResponse;
pub type B2cResponse = ApiResponse;
pub type RegisterUrlResponse = ApiResponse;

impl ApiResponse {
    pub fn new(raw: Value) -> Self {
        let raw = match raw {
            Value::Object(_) => raw,
            Value::Null => Value::Object(Map::new()),
            other => {
                let mut map = Map::new();
                map.insert("body".to_string(), other);
                Value::Object(map)
            }
        };
        ApiResponse { raw }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.raw.get(key).and_then(value_as_string)
    }

    pub fn response_code(&self) -> Option<String> {
        self.get_str("ResponseCode")
    }

    pub fn response_description(&self) -> Option<String> {
        self.get_str("ResponseDescription")
    }

    pub fn conversation_id(&self) -> Option<String> {
        self.get_str("ConversationID")
    }

    pub fn originator_conversation_id(&self) -> Option<String> {
        self.get_str("OriginatorConversationID")
    }

    pub fn customer_message(&self) -> Option<String> {
        self.get_str("CustomerMessage")
    }

    pub fn merchant_request_id(&self) -> Option<String> {
        self.get_str("MerchantRequestID")
    }

    pub fn checkout_request_id(&self) -> Option<String> {
        self.get_str("CheckoutRequestID")
    }

    pub fn error_message(&self) -> Option<String> {
        self.get_str("errorMessage")
            .or_else(|| self.get_str("errorCode").map(|code| format!("Error Code: {}", code)))
    }

    /// Business success: the gateway accepted the request.
    pub fn is_successful(&self) -> bool {
        self.response_code().as_deref() == Some("0")
    }

    pub fn to_value(&self) -> Value {
        self.raw.clone()
    }

    pub fn into_value(self) -> Value {
        self.raw
    }

    pub fn to_json(&self) -> String {
        self.raw.to_string()
    }
}

impl From<Value> for ApiResponse {
    fn from(raw: Value) -> Self {
        ApiResponse::new(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct C2bSimulationResponse(ApiResponse);

impl C2bSimulationResponse {
    pub fn new(raw: Value) -> Self {
        C2bSimulationResponse(ApiResponse::new(raw))
    }
}

impl Deref for C2bSimulationResponse {
    type Target = ApiResponse;

    fn deref(&self) -> &ApiResponse {
        &self.0
    }
}

/// Response to an STK push status query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StkQueryResponse(ApiResponse);

impl StkQueryResponse {
    pub fn new(raw: Value) -> Self {
        StkQueryResponse(ApiResponse::new(raw))
    }

    pub fn result_code(&self) -> Option<String> {
        self.0.get_str("ResultCode")
    }

    pub fn result_desc(&self) -> Option<String> {
        self.0.get_str("ResultDesc")
    }

    /// The customer completed the prompt.
    pub fn is_paid(&self) -> bool {
        self.result_code().as_deref() == Some("0")
    }
}

impl Deref for StkQueryResponse {
    type Target = ApiResponse;

    fn deref(&self) -> &ApiResponse {
        &self.0
    }
}
