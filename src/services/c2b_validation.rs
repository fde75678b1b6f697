// services/c2b_validation.rs
use chrono::Utc;
use rand::Rng;
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::value_as_string;
use crate::models::C2bReceiverReply;
use crate::validation::{is_valid_msisdn, is_valid_shortcode};

pub const MISSING_FIELD: &str = "C2B00016";
pub const INVALID_MSISDN: &str = "C2B00011";
pub const INVALID_AMOUNT: &str = "C2B00013";
pub const INVALID_SHORTCODE: &str = "C2B00015";

const REQUIRED_FIELDS: [&str; 5] = [
    "TransID",
    "TransAmount",
    "BusinessShortCode",
    "BillRefNumber",
    "MSISDN",
];

/// Answers the gateway's C2B validation and confirmation requests. Makes no
/// outbound calls.
#[derive(Debug, Clone, Default)]
pub struct C2bValidator;

fn rejected(code: &str, desc: impl Into<String>) -> C2bReceiverReply {
    C2bReceiverReply {
        result_code: code.to_string(),
        result_desc: desc.into(),
        third_party_trans_id: Some(String::new()),
    }
}

fn field(request: &Value, key: &str) -> Option<String> {
    request.get(key).and_then(value_as_string)
}

pub fn generate_third_party_trans_id() -> String {
    let suffix: u32 = rand::rng().random_range(1000..=9999);
    format!("TXN{}{}", Utc::now().timestamp(), suffix)
}

impl C2bValidator {
    pub fn new() -> Self {
        C2bValidator
    }

    pub fn handle_validation(&self, request: &Value) -> C2bReceiverReply {
        if let Some(missing) = REQUIRED_FIELDS
            .iter()
            .find(|key| request.get(**key).map_or(true, Value::is_null))
        {
            warn!("C2B validation rejected: missing {}", missing);
            return rejected(MISSING_FIELD, format!("Missing required field: {}", missing));
        }

        let msisdn = field(request, "MSISDN").unwrap_or_default();
        if !is_valid_msisdn(&msisdn) {
            warn!("C2B validation rejected: invalid MSISDN {}", msisdn);
            return rejected(INVALID_MSISDN, "Invalid MSISDN");
        }

        let amount = field(request, "TransAmount")
            .and_then(|a| a.trim().parse::<f64>().ok())
            .filter(|a| a.is_finite() && *a > 0.0);
        if amount.is_none() {
            warn!("C2B validation rejected: invalid amount");
            return rejected(INVALID_AMOUNT, "Invalid Amount");
        }

        let shortcode = field(request, "BusinessShortCode").unwrap_or_default();
        if !is_valid_shortcode(&shortcode) {
            warn!("C2B validation rejected: invalid shortcode {}", shortcode);
            return rejected(INVALID_SHORTCODE, "Invalid Shortcode");
        }

        let trans_id = generate_third_party_trans_id();
        info!(
            "C2B validation accepted {} as {}",
            field(request, "TransID").unwrap_or_default(),
            trans_id
        );
        C2bReceiverReply {
            result_code: "0".to_string(),
            result_desc: "Accepted".to_string(),
            third_party_trans_id: Some(trans_id),
        }
    }

    pub fn handle_confirmation(&self, request: &Value) -> C2bReceiverReply {
        info!("C2B confirmation received: {}", request);
        C2bReceiverReply {
            result_code: "0".to_string(),
            result_desc: "Success".to_string(),
            third_party_trans_id: None,
        }
    }
}
