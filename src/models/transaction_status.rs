// models/transaction_status.rs
use serde::Serialize;
use serde_json::Value;
use std::ops::Deref;

use crate::errors::value_as_string;
use crate::models::response::ApiResponse;
use crate::models::result_parameters::{
    collect_result_parameters, find_parameter, find_parameter_string, ResultParameter,
};

/// Transaction status response or result callback, with the result
/// parameters flattened into typed fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionStatusResponse {
    #[serde(flatten)]
    base: ApiResponse,
    #[serde(skip)]
    result_type: Option<String>,
    #[serde(skip)]
    result_code: Option<String>,
    #[serde(skip)]
    result_desc: Option<String>,
    #[serde(skip)]
    parameters: Vec<ResultParameter>,
}

impl TransactionStatusResponse {
    pub fn new(raw: Value) -> Self {
        let base = ApiResponse::new(raw);
        let result = base.get("Result").cloned().unwrap_or(Value::Null);
        let field = |key: &str| result.get(key).and_then(value_as_string);

        TransactionStatusResponse {
            result_type: field("ResultType"),
            result_code: field("ResultCode"),
            result_desc: field("ResultDesc"),
            parameters: collect_result_parameters(&result),
            base,
        }
    }

    pub fn result_type(&self) -> Option<&str> {
        self.result_type.as_deref()
    }

    pub fn result_code(&self) -> Option<&str> {
        self.result_code.as_deref()
    }

    pub fn result_desc(&self) -> Option<&str> {
        self.result_desc.as_deref()
    }

    pub fn transaction_status(&self) -> Option<String> {
        find_parameter_string(&self.parameters, "TransactionStatus")
    }

    pub fn amount(&self) -> Option<f64> {
        find_parameter(&self.parameters, "Amount").and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn transaction_date(&self) -> Option<String> {
        find_parameter_string(&self.parameters, "FinalisedTime")
    }

    pub fn phone_number(&self) -> Option<String> {
        find_parameter_string(&self.parameters, "PhoneNumber")
    }

    pub fn debit_party_name(&self) -> Option<String> {
        find_parameter_string(&self.parameters, "DebitPartyName")
    }

    pub fn credit_party_name(&self) -> Option<String> {
        find_parameter_string(&self.parameters, "CreditPartyName")
    }

    pub fn receipt_number(&self) -> Option<String> {
        find_parameter_string(&self.parameters, "ReceiptNo")
    }

    pub fn result_parameters(&self) -> &[ResultParameter] {
        &self.parameters
    }

    pub fn result_parameter(&self, key: &str) -> Option<&Value> {
        find_parameter(&self.parameters, key)
    }

    pub fn is_completed(&self) -> bool {
        self.transaction_status().as_deref() == Some("Completed")
    }
}

impl Deref for TransactionStatusResponse {
    type Target = ApiResponse;

    fn deref(&self) -> &ApiResponse {
        &self.base
    }
}
