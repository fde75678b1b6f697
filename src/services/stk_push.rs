// services/stk_push.rs
use base64::{engine::general_purpose::STANDARD as base64, Engine as _};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::errors::{MpesaError, Result};
use crate::models::{StkPushResponse, StkQueryResponse};
use crate::services::api_client::ApiClient;
use crate::validation::{
    ensure_https_url, ensure_msisdn, ensure_positive_amount, validate_https_url, validate_msisdn,
    C2B_COMMAND_ID,
};

pub const STK_PUSH_PATH: &str = "/mpesa/stkpush/v3/processrequest";
pub const STK_QUERY_PATH: &str = "/mpesa/stkpushquery/v1/query";
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// `base64(shortcode + passkey + timestamp)`
pub fn generate_password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    base64.encode(format!("{}{}{}", shortcode, passkey, timestamp))
}

pub fn current_timestamp() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Clone, Validate)]
pub struct StkPushRequest {
    #[validate(
        length(min = 1, message = "Phone number is required"),
        custom(function = "validate_msisdn")
    )]
    pub phone_number: String,
    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than 0"))]
    pub amount: f64,
    #[validate(
        length(min = 1, message = "Callback URL is required"),
        custom(function = "validate_https_url")
    )]
    pub callback_url: String,
    pub account_reference: String,
    pub transaction_desc: String,
    pub timestamp: Option<String>,
    pub test_password: Option<String>,
}

impl Default for StkPushRequest {
    fn default() -> Self {
        StkPushRequest {
            phone_number: String::new(),
            amount: 0.0,
            callback_url: String::new(),
            account_reference: "123456".to_string(),
            transaction_desc: "Payment".to_string(),
            timestamp: None,
            test_password: None,
        }
    }
}

impl StkPushRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phone_number(mut self, phone: impl Into<String>) -> Result<Self> {
        let phone = phone.into();
        ensure_msisdn(&phone)?;
        self.phone_number = phone;
        Ok(self)
    }

    pub fn amount(mut self, amount: f64) -> Result<Self> {
        ensure_positive_amount(amount)?;
        self.amount = amount;
        Ok(self)
    }

    pub fn callback_url(mut self, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        ensure_https_url(&url, "Callback URL")?;
        self.callback_url = url;
        Ok(self)
    }

    pub fn account_reference(mut self, reference: impl Into<String>) -> Self {
        self.account_reference = reference.into();
        self
    }

    pub fn transaction_desc(mut self, desc: impl Into<String>) -> Self {
        self.transaction_desc = desc.into();
        self
    }

    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Overrides the generated password. Only honoured in the sandbox.
    pub fn test_password(mut self, password: impl Into<String>) -> Self {
        self.test_password = Some(password.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceItem {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct StkPushPayload {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "BusinessShortCode")]
    pub business_short_code: String,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "TransactionType")]
    pub transaction_type: String,
    #[serde(rename = "Amount")]
    pub amount: f64,
    #[serde(rename = "PartyA")]
    pub party_a: String,
    #[serde(rename = "PartyB")]
    pub party_b: String,
    #[serde(rename = "PhoneNumber")]
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    #[serde(rename = "AccountReference")]
    pub account_reference: String,
    #[serde(rename = "TransactionDesc")]
    pub transaction_desc: String,
    #[serde(rename = "ReferenceData")]
    pub reference_data: Vec<ReferenceItem>,
}

#[derive(Debug, Serialize)]
pub struct StkQueryPayload {
    #[serde(rename = "BusinessShortCode")]
    pub business_short_code: String,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
}

#[derive(Clone)]
pub struct StkPushService {
    api: Arc<ApiClient>,
}

impl StkPushService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        StkPushService { api }
    }

    /// Sends an STK push prompt to the customer's phone.
    pub async fn push(&self, request: StkPushRequest) -> Result<StkPushResponse> {
        let payload = self.build_payload(&request)?;
        info!(
            "STK push for {} - amount {}",
            payload.phone_number, payload.amount
        );
        let response = self.api.post_checked(STK_PUSH_PATH, &payload).await?;
        Ok(StkPushResponse::new(response))
    }

    pub async fn push_with(
        &self,
        phone_number: &str,
        amount: f64,
        callback_url: &str,
    ) -> Result<StkPushResponse> {
        let request = StkPushRequest::new()
            .phone_number(phone_number)?
            .amount(amount)?
            .callback_url(callback_url)?;
        self.push(request).await
    }

    /// Polls the status of an earlier push by its checkout request id.
    pub async fn query(
        &self,
        checkout_request_id: &str,
        timestamp: Option<&str>,
    ) -> Result<StkQueryResponse> {
        if checkout_request_id.trim().is_empty() {
            return Err(MpesaError::invalid_data("Checkout request ID is required"));
        }
        let config = self.api.config();
        let timestamp = timestamp.map(str::to_string).unwrap_or_else(current_timestamp);
        let payload = StkQueryPayload {
            business_short_code: config.shortcode().to_string(),
            password: generate_password(config.shortcode(), config.passkey(), &timestamp),
            timestamp,
            checkout_request_id: checkout_request_id.to_string(),
        };

        info!("STK query for {}", checkout_request_id);
        let response = self.api.post_checked(STK_QUERY_PATH, &payload).await?;
        Ok(StkQueryResponse::new(response))
    }

    pub fn build_payload(&self, request: &StkPushRequest) -> Result<StkPushPayload> {
        request.validate()?;
        let config = self.api.config();
        if config.shortcode().is_empty() {
            return Err(MpesaError::invalid_data("Shortcode is required"));
        }
        if request.test_password.is_some() && config.is_production() {
            return Err(MpesaError::invalid_data(
                "Test passwords can only be set in sandbox environment",
            ));
        }

        let timestamp = request.timestamp.clone().unwrap_or_else(current_timestamp);
        let password = match &request.test_password {
            Some(password) => password.clone(),
            None => generate_password(config.shortcode(), config.passkey(), &timestamp),
        };

        Ok(StkPushPayload {
            merchant_request_id: format!("Partner name-{}", Uuid::new_v4()),
            business_short_code: config.shortcode().to_string(),
            password,
            timestamp,
            transaction_type: C2B_COMMAND_ID.to_string(),
            amount: request.amount,
            party_a: request.phone_number.clone(),
            party_b: config.shortcode().to_string(),
            phone_number: request.phone_number.clone(),
            callback_url: request.callback_url.clone(),
            account_reference: request.account_reference.clone(),
            transaction_desc: request.transaction_desc.clone(),
            reference_data: vec![ReferenceItem {
                key: "ThirdPartyReference".to_string(),
                value: format!("Ref-{}", Uuid::new_v4()),
            }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_is_base64_of_concatenation() {
        let password = generate_password("174379", "pass", "20240101000000");
        assert_eq!(password, base64.encode("174379pass20240101000000"));
        assert_eq!(password, "MTc0Mzc5cGFzczIwMjQwMTAxMDAwMDAw");
    }

    #[test]
    fn timestamp_has_fourteen_digits() {
        let ts = current_timestamp();
        assert_eq!(ts.len(), 14);
        assert!(ts.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn setters_fail_fast() {
        assert!(StkPushRequest::new().phone_number("0712345678").is_err());
        assert!(StkPushRequest::new().amount(0.0).is_err());
        assert!(StkPushRequest::new().callback_url("http://example.com").is_err());
    }

    #[test]
    fn unset_fields_fail_validation() {
        let err: MpesaError = StkPushRequest::new().validate().unwrap_err().into();
        let message = err.to_string();
        assert!(message.contains("Phone number is required"));
        assert!(message.contains("Amount must be greater than 0"));
        assert!(message.contains("Callback URL is required"));
    }
}
