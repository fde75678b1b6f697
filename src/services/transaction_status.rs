// services/transaction_status.rs
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::errors::{MpesaError, Result};
use crate::models::TransactionStatusResponse;
use crate::services::api_client::ApiClient;
use crate::validation::{ensure_https_url, validate_https_url};

pub const TRANSACTION_STATUS_PATH: &str = "/mpesa/transactionstatus/v1/query";

#[derive(Debug, Clone, Validate)]
pub struct TransactionStatusRequest {
    #[validate(length(min = 1, message = "Initiator is required for transaction status query"))]
    pub initiator: String,
    #[validate(length(
        min = 1,
        message = "Security credential is required for transaction status query"
    ))]
    pub security_credential: String,
    pub transaction_id: Option<String>,
    pub original_conversation_id: Option<String>,
    pub identifier_type: String,
    pub remarks: String,
    pub occasion: Option<String>,
    #[validate(
        length(min = 1, message = "Result URL is required for transaction status query"),
        custom(function = "validate_https_url")
    )]
    pub result_url: String,
    #[validate(
        length(min = 1, message = "Timeout URL is required for transaction status query"),
        custom(function = "validate_https_url")
    )]
    pub queue_timeout_url: String,
}

impl Default for TransactionStatusRequest {
    fn default() -> Self {
        TransactionStatusRequest {
            initiator: String::new(),
            security_credential: String::new(),
            transaction_id: None,
            original_conversation_id: None,
            identifier_type: "4".to_string(),
            remarks: "Transaction Status Query".to_string(),
            occasion: None,
            result_url: String::new(),
            queue_timeout_url: String::new(),
        }
    }
}

impl TransactionStatusRequest {
    pub fn new(initiator: impl Into<String>, security_credential: impl Into<String>) -> Self {
        TransactionStatusRequest {
            initiator: initiator.into(),
            security_credential: security_credential.into(),
            ..Self::default()
        }
    }

    pub fn transaction_id(mut self, id: impl Into<String>) -> Self {
        self.transaction_id = Some(id.into());
        self
    }

    pub fn original_conversation_id(mut self, id: impl Into<String>) -> Self {
        self.original_conversation_id = Some(id.into());
        self
    }

    pub fn identifier_type(mut self, identifier_type: impl Into<String>) -> Self {
        self.identifier_type = identifier_type.into();
        self
    }

    pub fn remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = remarks.into();
        self
    }

    pub fn occasion(mut self, occasion: impl Into<String>) -> Self {
        self.occasion = Some(occasion.into());
        self
    }

    pub fn result_url(mut self, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        ensure_https_url(&url, "Result URL")?;
        self.result_url = url;
        Ok(self)
    }

    pub fn queue_timeout_url(mut self, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        ensure_https_url(&url, "Timeout URL")?;
        self.queue_timeout_url = url;
        Ok(self)
    }

    fn ensure_identifier(&self) -> Result<()> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        if present(&self.transaction_id) || present(&self.original_conversation_id) {
            Ok(())
        } else {
            Err(MpesaError::invalid_data(
                "Either TransactionID or OriginalConversationID is required",
            ))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionStatusPayload {
    #[serde(rename = "Initiator")]
    pub initiator: String,
    #[serde(rename = "SecurityCredential")]
    pub security_credential: String,
    #[serde(rename = "CommandID")]
    pub command_id: String,
    #[serde(rename = "TransactionID")]
    pub transaction_id: String,
    #[serde(rename = "OriginalConversationID")]
    pub original_conversation_id: String,
    #[serde(rename = "PartyA")]
    pub party_a: String,
    #[serde(rename = "IdentifierType")]
    pub identifier_type: String,
    #[serde(rename = "ResultURL")]
    pub result_url: String,
    #[serde(rename = "QueueTimeOutURL")]
    pub queue_timeout_url: String,
    #[serde(rename = "Remarks")]
    pub remarks: String,
    #[serde(rename = "Occasion")]
    pub occasion: String,
}

#[derive(Clone)]
pub struct TransactionStatusService {
    api: Arc<ApiClient>,
}

impl TransactionStatusService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        TransactionStatusService { api }
    }

    pub async fn query(
        &self,
        request: TransactionStatusRequest,
    ) -> Result<TransactionStatusResponse> {
        request.validate()?;
        request.ensure_identifier()?;

        let payload = TransactionStatusPayload {
            initiator: request.initiator,
            security_credential: request.security_credential,
            command_id: "TransactionStatusQuery".to_string(),
            transaction_id: request.transaction_id.unwrap_or_else(|| "0".to_string()),
            original_conversation_id: request.original_conversation_id.unwrap_or_default(),
            party_a: self.api.config().shortcode().to_string(),
            identifier_type: request.identifier_type,
            result_url: request.result_url,
            queue_timeout_url: request.queue_timeout_url,
            remarks: request.remarks,
            occasion: request.occasion.unwrap_or_default(),
        };

        info!(
            "Transaction status query for {} / {}",
            payload.transaction_id, payload.original_conversation_id
        );
        let response = self.api.post_checked(TRANSACTION_STATUS_PATH, &payload).await?;
        Ok(TransactionStatusResponse::new(response))
    }

    /// Parses the asynchronous result POSTed to the query's result URL.
    pub fn parse_callback(payload: Value) -> Result<TransactionStatusResponse> {
        if !payload.get("Result").is_some_and(Value::is_object) {
            return Err(MpesaError::decode(
                "Invalid callback data: Missing Result object",
                payload.to_string(),
            ));
        }
        Ok(TransactionStatusResponse::new(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requires_an_identifier() {
        let request = TransactionStatusRequest::new("apiop", "cred")
            .result_url("https://example.com/result")
            .unwrap()
            .queue_timeout_url("https://example.com/timeout")
            .unwrap();
        assert!(request.validate().is_ok());
        assert!(request.ensure_identifier().is_err());
        assert!(request
            .clone()
            .original_conversation_id("AG_1")
            .ensure_identifier()
            .is_ok());
        assert!(request.transaction_id("").ensure_identifier().is_err());
    }

    #[test]
    fn callback_requires_result_object() {
        assert!(TransactionStatusService::parse_callback(json!({"Body": {}})).is_err());
        let parsed = TransactionStatusService::parse_callback(json!({
            "Result": {"ResultCode": 0, "ResultDesc": "ok"}
        }))
        .unwrap();
        assert_eq!(parsed.result_code(), Some("0"));
    }
}
