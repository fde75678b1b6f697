// models/c2b.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::Deref;

use crate::models::response::ApiResponse;

const BASE_KEYS: [&str; 5] = [
    "ResponseCode",
    "ResponseDescription",
    "ConversationID",
    "OriginatorConversationID",
    "ThirdPartyTransID",
];

/// Reply the receiver sends back to the gateway for a validation or
/// confirmation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct C2bReceiverReply {
    #[serde(rename = "ResultCode")]
    pub result_code: String,
    #[serde(rename = "ResultDesc")]
    pub result_desc: String,
    #[serde(rename = "ThirdPartyTransID", skip_serializing_if = "Option::is_none")]
    pub third_party_trans_id: Option<String>,
}

impl C2bReceiverReply {
    pub fn is_accepted(&self) -> bool {
        self.result_code == "0"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct C2bValidationResponse(ApiResponse);

impl C2bValidationResponse {
    pub fn new(raw: Value) -> Self {
        C2bValidationResponse(ApiResponse::new(raw))
    }

    pub fn third_party_trans_id(&self) -> Option<String> {
        self.0.get_str("ThirdPartyTransID")
    }

    /// Every key other than the common response fields.
    pub fn transaction_details(&self) -> Map<String, Value> {
        match self.0.to_value() {
            Value::Object(map) => map
                .into_iter()
                .filter(|(key, _)| !BASE_KEYS.contains(&key.as_str()))
                .collect(),
            _ => Map::new(),
        }
    }

    pub fn transaction_detail(&self, key: &str) -> Option<Value> {
        if BASE_KEYS.contains(&key) {
            return None;
        }
        self.0.get(key).cloned()
    }
}

impl Deref for C2bValidationResponse {
    type Target = ApiResponse;

    fn deref(&self) -> &ApiResponse {
        &self.0
    }
}
