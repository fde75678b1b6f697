// validation.rs
use regex::Regex;
use std::sync::OnceLock;
use validator::ValidationError;

use crate::errors::{MpesaError, Result};

pub const B2C_COMMAND_IDS: [&str; 3] = ["BusinessPayment", "SalaryPayment", "PromotionPayment"];
pub const C2B_COMMAND_ID: &str = "CustomerPayBillOnline";
pub const REGISTER_URL_RESPONSE_TYPES: [&str; 2] = ["Completed", "Cancelled"];

fn msisdn_regex() -> &'static Regex {
    static MSISDN: OnceLock<Regex> = OnceLock::new();
    MSISDN.get_or_init(|| Regex::new(r"^251[17]\d{8}$").expect("static MSISDN pattern"))
}

fn shortcode_regex() -> &'static Regex {
    static SHORTCODE: OnceLock<Regex> = OnceLock::new();
    SHORTCODE.get_or_init(|| Regex::new(r"^\d{5,6}$").expect("static shortcode pattern"))
}

/// Ethiopian MSISDN: `251` followed by `1` or `7` and eight digits.
pub fn is_valid_msisdn(phone: &str) -> bool {
    msisdn_regex().is_match(phone)
}

/// Shortcodes accepted by the C2B receiver: five or six digits.
pub fn is_valid_shortcode(shortcode: &str) -> bool {
    shortcode_regex().is_match(shortcode)
}

pub fn is_numeric(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// Absolute `https://` URL with a host.
pub fn is_https_url(url: &str) -> bool {
    match url.strip_prefix("https://") {
        Some(rest) => {
            let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
            !host.is_empty() && !url.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

pub fn ensure_msisdn(phone: &str) -> Result<()> {
    if is_valid_msisdn(phone) {
        Ok(())
    } else {
        Err(MpesaError::invalid_data(
            "Phone number must be in the format 251XXXXXXXXX",
        ))
    }
}

pub fn ensure_positive_amount(amount: f64) -> Result<()> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(MpesaError::invalid_data("Amount must be greater than 0"))
    }
}

pub fn ensure_https_url(url: &str, label: &str) -> Result<()> {
    if is_https_url(url) {
        Ok(())
    } else {
        Err(MpesaError::invalid_data(format!(
            "{} must be a valid HTTPS URL",
            label
        )))
    }
}

pub fn ensure_b2c_command_id(command_id: &str) -> Result<()> {
    if B2C_COMMAND_IDS.contains(&command_id) {
        Ok(())
    } else {
        Err(MpesaError::invalid_data(format!(
            "Invalid CommandID. Must be one of: {}",
            B2C_COMMAND_IDS.join(", ")
        )))
    }
}

pub fn ensure_c2b_command_id(command_id: &str) -> Result<()> {
    if command_id == C2B_COMMAND_ID {
        Ok(())
    } else {
        Err(MpesaError::invalid_data(
            "Invalid CommandID. Must be CustomerPayBillOnline",
        ))
    }
}

// `validator` custom functions; empty values are left to the length rules.

pub(crate) fn validate_msisdn(phone: &str) -> std::result::Result<(), ValidationError> {
    if phone.is_empty() || is_valid_msisdn(phone) {
        return Ok(());
    }
    let mut err = ValidationError::new("msisdn");
    err.message = Some("Phone number must be in the format 251XXXXXXXXX".into());
    Err(err)
}

pub(crate) fn validate_https_url(url: &str) -> std::result::Result<(), ValidationError> {
    if url.is_empty() || is_https_url(url) {
        return Ok(());
    }
    let mut err = ValidationError::new("https_url");
    err.message = Some(format!("{} is not a valid HTTPS URL", url).into());
    Err(err)
}

pub(crate) fn validate_b2c_command_id(
    command_id: &str,
) -> std::result::Result<(), ValidationError> {
    if B2C_COMMAND_IDS.contains(&command_id) {
        return Ok(());
    }
    let mut err = ValidationError::new("command_id");
    err.message = Some(
        format!(
            "Invalid CommandID. Must be one of: {}",
            B2C_COMMAND_IDS.join(", ")
        )
        .into(),
    );
    Err(err)
}

pub(crate) fn validate_c2b_command_id(
    command_id: &str,
) -> std::result::Result<(), ValidationError> {
    if command_id == C2B_COMMAND_ID {
        return Ok(());
    }
    let mut err = ValidationError::new("command_id");
    err.message = Some("Invalid CommandID. Must be CustomerPayBillOnline".into());
    Err(err)
}

pub(crate) fn validate_numeric(value: &str) -> std::result::Result<(), ValidationError> {
    if value.is_empty() || is_numeric(value) {
        return Ok(());
    }
    let mut err = ValidationError::new("numeric");
    err.message = Some("Invalid shortcode provided".into());
    Err(err)
}

pub(crate) fn validate_response_type(value: &str) -> std::result::Result<(), ValidationError> {
    if REGISTER_URL_RESPONSE_TYPES.contains(&value) {
        return Ok(());
    }
    let mut err = ValidationError::new("response_type");
    err.message = Some("Response type must be either Completed or Cancelled".into());
    Err(err)
}
