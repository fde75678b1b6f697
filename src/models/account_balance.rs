// models/account_balance.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ops::Deref;

use crate::errors::{value_as_string, MpesaError, Result};
use crate::models::response::ApiResponse;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalanceEntry {
    pub account: String,
    pub currency: String,
    pub amount: String,
}

/// Splits the `AccountBalance` result parameter of a balance callback,
/// `"Account|Currency|Amount&Account|Currency|Amount..."`, in order.
pub fn parse_balance_result(payload: &Value) -> Result<Vec<AccountBalanceEntry>> {
    let params = payload
        .pointer("/Result/ResultParameters/ResultParameter")
        .ok_or_else(|| MpesaError::decode("Invalid balance result format", payload.to_string()))?;

    let params: Vec<&Value> = match params {
        Value::Array(items) => items.iter().collect(),
        single @ Value::Object(_) => vec![single],
        _ => {
            return Err(MpesaError::decode(
                "Invalid balance result format",
                payload.to_string(),
            ))
        }
    };

    let balance = params
        .into_iter()
        .find(|p| p.get("Key").and_then(Value::as_str) == Some("AccountBalance"))
        .and_then(|p| p.get("Value"))
        .and_then(value_as_string);

    match balance {
        Some(raw) => parse_balance_string(&raw),
        None => Ok(Vec::new()),
    }
}

pub fn parse_balance_string(raw: &str) -> Result<Vec<AccountBalanceEntry>> {
    raw.split('&')
        .filter(|segment| !segment.trim().is_empty())
        .map(|segment| {
            let fields: Vec<&str> = segment.split('|').collect();
            match fields.as_slice() {
                [account, currency, amount] => Ok(AccountBalanceEntry {
                    account: account.to_string(),
                    currency: currency.to_string(),
                    amount: amount.to_string(),
                }),
                _ => Err(MpesaError::decode(
                    format!("Malformed account balance segment: {}", segment),
                    raw,
                )),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AccountBalanceResponse(ApiResponse);

impl AccountBalanceResponse {
    pub fn new(raw: Value) -> Self {
        AccountBalanceResponse(ApiResponse::new(raw))
    }

    pub fn result(&self) -> Option<&Value> {
        self.0.get("Result")
    }

    pub fn balances(&self) -> Result<Vec<AccountBalanceEntry>> {
        parse_balance_result(&self.0.to_value())
    }
}

impl Deref for AccountBalanceResponse {
    type Target = ApiResponse;

    fn deref(&self) -> &ApiResponse {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_accounts_in_order() {
        let payload = json!({
            "Result": {
                "ResultParameters": {
                    "ResultParameter": [
                        {"Key": "BOCompletedTime", "Value": 20240101120000u64},
                        {"Key": "AccountBalance", "Value": "Working Account|ETB|1000.00&Utility Account|ETB|500.00"}
                    ]
                }
            }
        });
        let entries = parse_balance_result(&payload).unwrap();
        assert_eq!(
            entries,
            vec![
                AccountBalanceEntry {
                    account: "Working Account".into(),
                    currency: "ETB".into(),
                    amount: "1000.00".into(),
                },
                AccountBalanceEntry {
                    account: "Utility Account".into(),
                    currency: "ETB".into(),
                    amount: "500.00".into(),
                },
            ]
        );
    }

    #[test]
    fn missing_parameter_list_is_an_error() {
        let err = parse_balance_result(&json!({"Result": {"ResultCode": 0}})).unwrap_err();
        assert!(matches!(err, MpesaError::Decode { .. }));
    }

    #[test]
    fn malformed_segment_is_an_error() {
        let err = parse_balance_string("Working Account|ETB").unwrap_err();
        assert!(matches!(err, MpesaError::Decode { .. }));
    }

    #[test]
    fn no_balance_parameter_yields_empty_list() {
        let payload = json!({
            "Result": {"ResultParameters": {"ResultParameter": [{"Key": "Other", "Value": "x"}]}}
        });
        assert!(parse_balance_result(&payload).unwrap().is_empty());
    }
}
