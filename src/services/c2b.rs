// services/c2b.rs
use reqwest::Url;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::errors::{MpesaError, Result};
use crate::models::{C2bSimulationResponse, RegisterUrlResponse};
use crate::services::api_client::{ensure_accepted, ApiClient};
use crate::validation::{
    ensure_c2b_command_id, ensure_msisdn, ensure_positive_amount, validate_c2b_command_id,
    validate_https_url, validate_msisdn, validate_numeric, validate_response_type,
};

pub const REGISTER_URL_PATH: &str = "/v1/c2b-register-url/register";
pub const SIMULATE_PATH: &str = "/mpesa/b2c/simulatetransaction/v1/request";

#[derive(Debug, Clone, Serialize, Validate)]
pub struct RegisterUrlRequest {
    #[serde(rename = "ShortCode")]
    #[validate(
        length(min = 1, message = "Invalid shortcode provided"),
        custom(function = "validate_numeric")
    )]
    pub short_code: String,
    #[serde(rename = "ResponseType")]
    #[validate(custom(function = "validate_response_type"))]
    pub response_type: String,
    #[serde(rename = "CommandID")]
    pub command_id: String,
    #[serde(rename = "ConfirmationURL")]
    #[validate(
        length(min = 1, message = "Confirmation URL is required"),
        custom(function = "validate_https_url")
    )]
    pub confirmation_url: String,
    #[serde(rename = "ValidationURL")]
    #[validate(
        length(min = 1, message = "Validation URL is required"),
        custom(function = "validate_https_url")
    )]
    pub validation_url: String,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for RegisterUrlRequest {
    fn default() -> Self {
        RegisterUrlRequest {
            short_code: String::new(),
            response_type: "Completed".to_string(),
            command_id: "RegisterURL".to_string(),
            confirmation_url: String::new(),
            validation_url: String::new(),
            api_key: None,
        }
    }
}

impl RegisterUrlRequest {
    pub fn new(
        short_code: impl Into<String>,
        response_type: impl Into<String>,
        confirmation_url: impl Into<String>,
        validation_url: impl Into<String>,
    ) -> Self {
        RegisterUrlRequest {
            short_code: short_code.into(),
            response_type: response_type.into(),
            confirmation_url: confirmation_url.into(),
            validation_url: validation_url.into(),
            ..Self::default()
        }
    }

    pub fn command_id(mut self, command_id: impl Into<String>) -> Self {
        self.command_id = command_id.into();
        self
    }

    /// Defaults to the configured consumer key when unset.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[derive(Debug, Clone, Default, Validate)]
pub struct C2bSimulationRequest {
    #[validate(custom(function = "validate_c2b_command_id"))]
    pub command_id: String,
    #[validate(range(exclusive_min = 0.0, message = "Amount must be set before executing C2B simulation"))]
    pub amount: f64,
    #[validate(
        length(min = 1, message = "MSISDN (phone number) must be set before executing C2B simulation"),
        custom(function = "validate_msisdn")
    )]
    pub msisdn: String,
    #[validate(length(min = 1, message = "Bill reference number must be set before executing C2B simulation"))]
    pub bill_ref_number: String,
    pub short_code: Option<String>,
}

impl C2bSimulationRequest {
    pub fn new() -> Self {
        C2bSimulationRequest {
            command_id: crate::validation::C2B_COMMAND_ID.to_string(),
            ..Self::default()
        }
    }

    pub fn command_id(mut self, command_id: impl Into<String>) -> Result<Self> {
        let command_id = command_id.into();
        ensure_c2b_command_id(&command_id)?;
        self.command_id = command_id;
        Ok(self)
    }

    pub fn amount(mut self, amount: f64) -> Result<Self> {
        ensure_positive_amount(amount)?;
        self.amount = amount;
        Ok(self)
    }

    pub fn msisdn(mut self, msisdn: impl Into<String>) -> Result<Self> {
        let msisdn = msisdn.into();
        ensure_msisdn(&msisdn)?;
        self.msisdn = msisdn;
        Ok(self)
    }

    pub fn bill_ref_number(mut self, reference: impl Into<String>) -> Self {
        self.bill_ref_number = reference.into();
        self
    }

    pub fn short_code(mut self, short_code: impl Into<String>) -> Self {
        self.short_code = Some(short_code.into());
        self
    }
}

#[derive(Debug, Serialize)]
pub struct C2bSimulationPayload {
    #[serde(rename = "CommandID")]
    pub command_id: String,
    #[serde(rename = "Amount")]
    pub amount: String,
    #[serde(rename = "Msisdn")]
    pub msisdn: String,
    #[serde(rename = "BillRefNumber")]
    pub bill_ref_number: String,
    #[serde(rename = "ShortCode")]
    pub short_code: String,
}

#[derive(Clone)]
pub struct C2bService {
    api: Arc<ApiClient>,
}

impl C2bService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        C2bService { api }
    }

    /// Registers the confirmation and validation URLs for a shortcode.
    pub async fn register_url(&self, request: RegisterUrlRequest) -> Result<RegisterUrlResponse> {
        request.validate()?;
        let api_key = request
            .api_key
            .clone()
            .unwrap_or_else(|| self.api.config().consumer_key().to_string());
        if api_key.is_empty() {
            return Err(MpesaError::invalid_data("API key not set"));
        }

        let url = Url::parse_with_params(&self.api.url(REGISTER_URL_PATH), &[("apikey", api_key)])
            .map_err(|e| MpesaError::Config(format!("Invalid register URL endpoint: {}", e)))?;

        info!(
            "Registering C2B URLs for shortcode {} ({})",
            request.short_code, request.response_type
        );
        let response = ensure_accepted(self.api.post_to(url.to_string(), &request).await?)?;
        Ok(RegisterUrlResponse::new(response))
    }

    pub async fn simulate(&self, request: C2bSimulationRequest) -> Result<C2bSimulationResponse> {
        request.validate()?;
        let short_code = request
            .short_code
            .clone()
            .unwrap_or_else(|| self.api.config().shortcode().to_string());
        if short_code.is_empty() {
            return Err(MpesaError::invalid_data("Shortcode is required"));
        }

        let payload = C2bSimulationPayload {
            command_id: request.command_id,
            amount: request.amount.to_string(),
            msisdn: request.msisdn,
            bill_ref_number: request.bill_ref_number,
            short_code,
        };
        info!(
            "Simulating C2B payment of {} from {} to {}",
            payload.amount, payload.msisdn, payload.short_code
        );
        let response = self.api.post_checked(SIMULATE_PATH, &payload).await?;
        Ok(C2bSimulationResponse::new(response))
    }

    pub async fn simulate_with(
        &self,
        amount: f64,
        msisdn: &str,
        bill_ref_number: &str,
    ) -> Result<C2bSimulationResponse> {
        let request = C2bSimulationRequest::new()
            .amount(amount)?
            .msisdn(msisdn)?
            .bill_ref_number(bill_ref_number);
        self.simulate(request).await
    }
}
