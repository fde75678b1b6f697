// services/account_balance.rs
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::errors::Result;
use crate::models::{parse_balance_result, AccountBalanceEntry, AccountBalanceResponse};
use crate::services::api_client::ApiClient;
use crate::validation::{ensure_https_url, validate_https_url};

pub const ACCOUNT_BALANCE_PATH: &str = "/mpesa/accountbalance/v2/query";

#[derive(Debug, Clone, Validate)]
pub struct AccountBalanceRequest {
    #[validate(length(min = 1, message = "Initiator is required for account balance"))]
    pub initiator: String,
    #[validate(length(min = 1, message = "PartyA is required for account balance"))]
    pub party_a: String,
    #[validate(length(min = 1, message = "Security credential is required for account balance"))]
    pub security_credential: String,
    pub identifier_type: String,
    pub remarks: String,
    pub originator_conversation_id: Option<String>,
    #[validate(
        length(min = 1, message = "Result URL is required for account balance"),
        custom(function = "validate_https_url")
    )]
    pub result_url: String,
    #[validate(
        length(min = 1, message = "Queue timeout URL is required for account balance"),
        custom(function = "validate_https_url")
    )]
    pub queue_timeout_url: String,
}

impl Default for AccountBalanceRequest {
    fn default() -> Self {
        AccountBalanceRequest {
            initiator: String::new(),
            party_a: String::new(),
            security_credential: String::new(),
            identifier_type: "4".to_string(),
            remarks: "Balance check".to_string(),
            originator_conversation_id: None,
            result_url: String::new(),
            queue_timeout_url: String::new(),
        }
    }
}

impl AccountBalanceRequest {
    pub fn new(
        initiator: impl Into<String>,
        party_a: impl Into<String>,
        security_credential: impl Into<String>,
    ) -> Self {
        AccountBalanceRequest {
            initiator: initiator.into(),
            party_a: party_a.into(),
            security_credential: security_credential.into(),
            ..Self::default()
        }
    }

    pub fn identifier_type(mut self, identifier_type: impl Into<String>) -> Self {
        self.identifier_type = identifier_type.into();
        self
    }

    pub fn remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = remarks.into();
        self
    }

    pub fn originator_conversation_id(mut self, id: impl Into<String>) -> Self {
        self.originator_conversation_id = Some(id.into());
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
pub struct AccountBalancePayload {
    #[serde(rename = "OriginatorConversationID")]
    pub originator_conversation_id: String,
    #[serde(rename = "Initiator")]
    pub initiator: String,
    #[serde(rename = "SecurityCredential")]
    pub security_credential: String,
    #[serde(rename = "CommandID")]
    pub command_id: String,
    #[serde(rename = "PartyA")]
    pub party_a: String,
    #[serde(rename = "IdentifierType")]
    pub identifier_type: String,
    #[serde(rename = "Remarks")]
    pub remarks: String,
    #[serde(rename = "QueueTimeOutURL")]
    pub queue_timeout_url: String,
    #[serde(rename = "ResultURL")]
    pub result_url: String,
}

impl From<AccountBalanceRequest> for AccountBalancePayload {
    fn from(request: AccountBalanceRequest) -> Self {
        AccountBalancePayload {
            originator_conversation_id: request
                .originator_conversation_id
                .unwrap_or_else(|| format!("Partner-{}", Uuid::new_v4())),
            initiator: request.initiator,
            security_credential: request.security_credential,
            command_id: "AccountBalance".to_string(),
            party_a: request.party_a,
            identifier_type: request.identifier_type,
            remarks: request.remarks,
            queue_timeout_url: request.queue_timeout_url,
            result_url: request.result_url,
        }
    }
}

#[derive(Clone)]
pub struct AccountBalanceService {
    api: Arc<ApiClient>,
}

impl AccountBalanceService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        AccountBalanceService { api }
    }

    /// Submits a balance query; the balances arrive later on the result URL.
    pub async fn query(&self, request: AccountBalanceRequest) -> Result<AccountBalanceResponse> {
        request.validate()?;
        let payload = AccountBalancePayload::from(request);
        info!(
            "Account balance query for {} ({})",
            payload.party_a, payload.originator_conversation_id
        );
        let response = self.api.post_checked(ACCOUNT_BALANCE_PATH, &payload).await?;
        Ok(AccountBalanceResponse::new(response))
    }

    pub fn parse_balance_result(payload: &Value) -> Result<Vec<AccountBalanceEntry>> {
        parse_balance_result(payload)
    }
}
