// models/callbacks.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{value_as_string, MpesaError, Result};
use crate::models::result_parameters::{
    collect_result_parameters, find_parameter, find_parameter_string, ResultParameter,
};

const STK_CANCELLED_BY_USER: i64 = 1032;

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackItem {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value", default)]
    pub value: Option<Value>,
}

// STK push callback: `Body.stkCallback`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StkCallback {
    pub merchant_request_id: Option<String>,
    pub checkout_request_id: Option<String>,
    pub result_code: Option<i64>,
    pub result_desc: Option<String>,
    pub items: Vec<CallbackItem>,
}

impl StkCallback {
    pub fn parse(payload: &Value) -> Result<Self> {
        let callback = payload
            .pointer("/Body/stkCallback")
            .filter(|v| v.is_object())
            .ok_or_else(|| MpesaError::decode("Missing Body.stkCallback", payload.to_string()))?;
        let field = |key: &str| callback.get(key).and_then(value_as_string);

        let items = match callback.pointer("/CallbackMetadata/Item") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect(),
            _ => Vec::new(),
        };

        Ok(StkCallback {
            merchant_request_id: field("MerchantRequestID"),
            checkout_request_id: field("CheckoutRequestID"),
            result_code: callback.get("ResultCode").and_then(value_as_i64),
            result_desc: field("ResultDesc"),
            items,
        })
    }

    pub fn is_successful(&self) -> bool {
        self.result_code == Some(0)
    }

    pub fn is_cancelled_by_user(&self) -> bool {
        self.result_code == Some(STK_CANCELLED_BY_USER)
    }

    pub fn item(&self, name: &str) -> Option<&Value> {
        self.items
            .iter()
            .find(|item| item.name == name)
            .and_then(|item| item.value.as_ref())
    }

    pub fn amount(&self) -> Option<f64> {
        self.item("Amount").and_then(value_as_f64)
    }

    pub fn mpesa_receipt_number(&self) -> Option<String> {
        self.item("MpesaReceiptNumber").and_then(value_as_string)
    }

    pub fn phone_number(&self) -> Option<String> {
        self.item("PhoneNumber").and_then(value_as_string)
    }

    pub fn transaction_date(&self) -> Option<String> {
        self.item("TransactionDate").and_then(value_as_string)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum B2cErrorCategory {
    PhoneNumber,
    Limit,
    InsufficientBalance,
    Credential,
    Validation,
    System,
    Other,
}

const B2C_RESULT_CODES: [&str; 37] = [
    "Success",
    "Internal Server Error",
    "Unauthorized",
    "Invalid initiator name",
    "Invalid security credential",
    "Invalid command ID",
    "Invalid party A",
    "Invalid party B",
    "Invalid amount",
    "Invalid remarks",
    "Invalid occassion",
    "Invalid URL",
    "Invalid queue timeout URL",
    "Invalid result URL",
    "Invalid transaction type",
    "Duplicate transaction",
    "Insufficient balance",
    "Invalid phone number",
    "Unregistered phone number",
    "Inactive phone number",
    "Blocked phone number",
    "Transaction limit exceeded",
    "Daily limit exceeded",
    "Weekly limit exceeded",
    "Monthly limit exceeded",
    "Invalid transaction",
    "Transaction expired",
    "Transaction cancelled",
    "Transaction failed",
    "Request cancelled",
    "Request timeout",
    "Request not found",
    "System error",
    "Invalid request",
    "Invalid parameters",
    "Invalid response",
    "Invalid status",
];

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct B2cAccountBalances {
    pub utility: Option<f64>,
    pub working: Option<f64>,
    pub charges: Option<f64>,
}

/// Asynchronous result of a B2C payment (also used for timeouts,
/// transaction-status and balance results that share the `Result` envelope).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct B2cResult {
    pub result_type: Option<i64>,
    pub result_code: Option<i64>,
    pub result_desc: Option<String>,
    pub originator_conversation_id: Option<String>,
    pub conversation_id: Option<String>,
    pub transaction_id: Option<String>,
    pub parameters: Vec<ResultParameter>,
}

impl B2cResult {
    pub fn parse(payload: &Value) -> Result<Self> {
        let result = payload
            .get("Result")
            .filter(|v| v.is_object())
            .ok_or_else(|| MpesaError::decode("Missing Result object", payload.to_string()))?;
        let field = |key: &str| result.get(key).and_then(value_as_string);

        Ok(B2cResult {
            result_type: result.get("ResultType").and_then(value_as_i64),
            result_code: result.get("ResultCode").and_then(value_as_i64),
            result_desc: field("ResultDesc"),
            originator_conversation_id: field("OriginatorConversationID"),
            conversation_id: field("ConversationID"),
            transaction_id: field("TransactionID"),
            parameters: collect_result_parameters(result),
        })
    }

    pub fn is_successful(&self) -> bool {
        self.result_code == Some(0)
    }

    pub fn parameter(&self, key: &str) -> Option<&Value> {
        find_parameter(&self.parameters, key)
    }

    pub fn transaction_amount(&self) -> Option<f64> {
        self.parameter("TransactionAmount").and_then(value_as_f64)
    }

    pub fn transaction_receipt(&self) -> Option<String> {
        find_parameter_string(&self.parameters, "TransactionReceipt")
    }

    pub fn receiver_name(&self) -> Option<String> {
        find_parameter_string(&self.parameters, "ReceiverPartyPublicName")
    }

    pub fn transaction_completed_at(&self) -> Option<String> {
        find_parameter_string(&self.parameters, "TransactionCompletedDateTime")
    }

    pub fn account_balances(&self) -> B2cAccountBalances {
        let funds = |key: &str| self.parameter(key).and_then(value_as_f64);
        B2cAccountBalances {
            utility: funds("B2CUtilityAccountAvailableFunds"),
            working: funds("B2CWorkingAccountAvailableFunds"),
            charges: funds("B2CChargesPaidAccountAvailableFunds"),
        }
    }

    pub fn is_recipient_registered(&self) -> Option<bool> {
        find_parameter_string(&self.parameters, "B2CRecipientIsRegisteredCustomer")
            .map(|flag| flag == "Y")
    }

    pub fn error_category(&self) -> Option<B2cErrorCategory> {
        let code = self.result_code.filter(|c| *c != 0)?;
        Some(match code {
            17..=20 => B2cErrorCategory::PhoneNumber,
            21..=24 => B2cErrorCategory::Limit,
            16 => B2cErrorCategory::InsufficientBalance,
            2..=4 => B2cErrorCategory::Credential,
            5..=14 | 34 => B2cErrorCategory::Validation,
            1 | 32 | 35 | 36 => B2cErrorCategory::System,
            _ => B2cErrorCategory::Other,
        })
    }

    pub fn detailed_error(&self) -> String {
        let Some(code) = self.result_code else {
            return "Unknown error occurred".to_string();
        };
        let known = usize::try_from(code)
            .ok()
            .and_then(|i| B2C_RESULT_CODES.get(i))
            .copied()
            .unwrap_or("Unknown error code");
        match &self.result_desc {
            Some(desc) => format!("Error Code: {} - {}. Details: {}", code, known, desc),
            None => format!("Error Code: {} - {}.", code, known),
        }
    }

    pub fn user_friendly_error(&self) -> &'static str {
        match self.error_category() {
            Some(B2cErrorCategory::PhoneNumber) => {
                "There was an issue with the recipient's phone number. Please verify the number and try again."
            }
            Some(B2cErrorCategory::Limit) => {
                "Transaction limit exceeded. Please try a lower amount or try again later."
            }
            Some(B2cErrorCategory::InsufficientBalance) => {
                "Insufficient balance to complete the transaction."
            }
            Some(B2cErrorCategory::Credential) => "Authentication failed. Please contact support.",
            Some(B2cErrorCategory::Validation) => {
                "Invalid transaction details provided. Please verify all information and try again."
            }
            Some(B2cErrorCategory::System) => {
                "A system error occurred. Please try again later or contact support if the problem persists."
            }
            _ => "An error occurred while processing the transaction. Please try again later.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stk_callback_reads_metadata() {
        let payload = json!({
            "Body": {
                "stkCallback": {
                    "MerchantRequestID": "Partner name-1",
                    "CheckoutRequestID": "ws_CO_123",
                    "ResultCode": 0,
                    "ResultDesc": "The service request is processed successfully.",
                    "CallbackMetadata": {
                        "Item": [
                            {"Name": "Amount", "Value": 10.0},
                            {"Name": "MpesaReceiptNumber", "Value": "SBL8ABCD"},
                            {"Name": "Balance"},
                            {"Name": "TransactionDate", "Value": 20240101120000u64},
                            {"Name": "PhoneNumber", "Value": 251712345678u64}
                        ]
                    }
                }
            }
        });
        let callback = StkCallback::parse(&payload).unwrap();
        assert!(callback.is_successful());
        assert_eq!(callback.amount(), Some(10.0));
        assert_eq!(callback.mpesa_receipt_number().as_deref(), Some("SBL8ABCD"));
        assert_eq!(callback.phone_number().as_deref(), Some("251712345678"));
        assert!(callback.item("Balance").is_none());
    }

    #[test]
    fn stk_cancellation_is_detected() {
        let payload = json!({
            "Body": {"stkCallback": {"ResultCode": "1032", "ResultDesc": "Request cancelled by user"}}
        });
        let callback = StkCallback::parse(&payload).unwrap();
        assert!(callback.is_cancelled_by_user());
        assert!(!callback.is_successful());
        assert!(StkCallback::parse(&json!({"Body": {}})).is_err());
    }

    #[test]
    fn b2c_result_parameters_and_balances() {
        let payload = json!({
            "Result": {
                "ResultType": 0,
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "OriginatorConversationID": "MPESA-B2C-1",
                "ConversationID": "AG_1",
                "TransactionID": "RKL51ZDR4F",
                "ResultParameters": {
                    "ResultParameter": [
                        {"Key": "TransactionAmount", "Value": 500},
                        {"Key": "TransactionReceipt", "Value": "RKL51ZDR4F"},
                        {"Key": "ReceiverPartyPublicName", "Value": "251712345678 - Abebe"},
                        {"Key": "B2CWorkingAccountAvailableFunds", "Value": "9500.00"},
                        {"Key": "B2CRecipientIsRegisteredCustomer", "Value": "Y"}
                    ]
                }
            }
        });
        let result = B2cResult::parse(&payload).unwrap();
        assert!(result.is_successful());
        assert_eq!(result.transaction_amount(), Some(500.0));
        assert_eq!(result.receiver_name().as_deref(), Some("251712345678 - Abebe"));
        assert_eq!(
            result.account_balances(),
            B2cAccountBalances {
                utility: None,
                working: Some(9500.0),
                charges: None
            }
        );
        assert_eq!(result.is_recipient_registered(), Some(true));
        assert!(result.error_category().is_none());
    }

    #[test]
    fn b2c_failures_are_classified() {
        let payload = json!({"Result": {"ResultCode": 16, "ResultDesc": "Declined"}});
        let result = B2cResult::parse(&payload).unwrap();
        assert_eq!(result.error_category(), Some(B2cErrorCategory::InsufficientBalance));
        assert_eq!(
            result.detailed_error(),
            "Error Code: 16 - Insufficient balance. Details: Declined"
        );
        assert_eq!(
            result.user_friendly_error(),
            "Insufficient balance to complete the transaction."
        );
        assert!(B2cResult::parse(&json!({})).is_err());
    }
}
