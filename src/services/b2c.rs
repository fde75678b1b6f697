// services/b2c.rs
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::errors::Result;
use crate::models::B2cResponse;
use crate::services::api_client::ApiClient;
use crate::validation::{
    ensure_b2c_command_id, ensure_https_url, ensure_msisdn, ensure_positive_amount,
    validate_b2c_command_id, validate_https_url, validate_msisdn,
};

pub const B2C_PATH: &str = "/mpesa/b2c/v2/paymentrequest";

#[derive(Debug, Clone, Validate)]
pub struct B2cRequest {
    #[validate(length(min = 1, message = "The InitiatorName field is required for B2C transaction"))]
    pub initiator_name: String,
    #[validate(length(min = 1, message = "The SecurityCredential field is required for B2C transaction"))]
    pub security_credential: String,
    #[validate(custom(function = "validate_b2c_command_id"))]
    pub command_id: String,
    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than 0"))]
    pub amount: f64,
    #[validate(length(min = 1, message = "The PartyA field is required for B2C transaction"))]
    pub party_a: String,
    #[validate(
        length(min = 1, message = "The PartyB field is required for B2C transaction"),
        custom(function = "validate_msisdn")
    )]
    pub party_b: String,
    #[validate(length(min = 1, message = "The Remarks field is required for B2C transaction"))]
    pub remarks: String,
    #[validate(length(min = 1, message = "The Occassion field is required for B2C transaction"))]
    pub occasion: String,
    #[validate(
        length(min = 1, message = "The ResultURL field is required for B2C transaction"),
        custom(function = "validate_https_url")
    )]
    pub result_url: String,
    #[validate(
        length(min = 1, message = "The QueueTimeOutURL field is required for B2C transaction"),
        custom(function = "validate_https_url")
    )]
    pub queue_timeout_url: String,
}

impl Default for B2cRequest {
    fn default() -> Self {
        B2cRequest {
            initiator_name: String::new(),
            security_credential: String::new(),
            command_id: "BusinessPayment".to_string(),
            amount: 0.0,
            party_a: String::new(),
            party_b: String::new(),
            remarks: String::new(),
            occasion: String::new(),
            result_url: String::new(),
            queue_timeout_url: String::new(),
        }
    }
}

impl B2cRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initiator_name(mut self, name: impl Into<String>) -> Self {
        self.initiator_name = name.into();
        self
    }

    pub fn security_credential(mut self, credential: impl Into<String>) -> Self {
        self.security_credential = credential.into();
        self
    }

    pub fn command_id(mut self, command_id: impl Into<String>) -> Result<Self> {
        let command_id = command_id.into();
        ensure_b2c_command_id(&command_id)?;
        self.command_id = command_id;
        Ok(self)
    }

    pub fn amount(mut self, amount: f64) -> Result<Self> {
        ensure_positive_amount(amount)?;
        self.amount = amount;
        Ok(self)
    }

    pub fn party_a(mut self, party_a: impl Into<String>) -> Self {
        self.party_a = party_a.into();
        self
    }

    pub fn party_b(mut self, phone: impl Into<String>) -> Result<Self> {
        let phone = phone.into();
        ensure_msisdn(&phone)?;
        self.party_b = phone;
        Ok(self)
    }

    pub fn remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = remarks.into();
        self
    }

    pub fn occasion(mut self, occasion: impl Into<String>) -> Self {
        self.occasion = occasion.into();
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
        ensure_https_url(&url, "Queue Timeout URL")?;
        self.queue_timeout_url = url;
        Ok(self)
    }
}

#[derive(Debug, Serialize)]
pub struct B2cPayload {
    #[serde(rename = "InitiatorName")]
    pub initiator_name: String,
    #[serde(rename = "SecurityCredential")]
    pub security_credential: String,
    #[serde(rename = "CommandID")]
    pub command_id: String,
    #[serde(rename = "Amount")]
    pub amount: f64,
    #[serde(rename = "PartyA")]
    pub party_a: String,
    #[serde(rename = "PartyB")]
    pub party_b: String,
    #[serde(rename = "Remarks")]
    pub remarks: String,
    #[serde(rename = "QueueTimeOutURL")]
    pub queue_timeout_url: String,
    #[serde(rename = "ResultURL")]
    pub result_url: String,
    // Gateway spelling.
    #[serde(rename = "Occassion")]
    pub occasion: String,
    #[serde(rename = "OriginatorConversationID")]
    pub originator_conversation_id: String,
}

impl From<B2cRequest> for B2cPayload {
    fn from(request: B2cRequest) -> Self {
        B2cPayload {
            initiator_name: request.initiator_name,
            security_credential: request.security_credential,
            command_id: request.command_id,
            amount: request.amount,
            party_a: request.party_a,
            party_b: request.party_b,
            remarks: request.remarks,
            queue_timeout_url: request.queue_timeout_url,
            result_url: request.result_url,
            occasion: request.occasion,
            originator_conversation_id: format!("MPESA-B2C-{}", Uuid::new_v4()),
        }
    }
}

#[derive(Clone)]
pub struct B2cService {
    api: Arc<ApiClient>,
}

impl B2cService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        B2cService { api }
    }

    /// Disburses funds from the business shortcode to a customer.
    pub async fn send(&self, request: B2cRequest) -> Result<B2cResponse> {
        request.validate()?;
        let payload = B2cPayload::from(request);
        info!(
            "B2C {} of {} to {} ({})",
            payload.command_id, payload.amount, payload.party_b, payload.originator_conversation_id
        );
        let response = self.api.post_checked(B2C_PATH, &payload).await?;
        Ok(B2cResponse::new(response))
    }
}
