// models/result_parameters.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::value_as_string;

/// One `{Key, Value}` entry from `Result.ResultParameters.ResultParameter`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultParameter {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value", default)]
    pub value: Value,
}

impl ResultParameter {
    pub fn value_string(&self) -> Option<String> {
        value_as_string(&self.value)
    }
}

/// Collects the well-formed parameters under `result`. A single object is
/// accepted in place of a list; entries without a `Key` are skipped.
pub fn collect_result_parameters(result: &Value) -> Vec<ResultParameter> {
    match result.pointer("/ResultParameters/ResultParameter") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        Some(item @ Value::Object(_)) => serde_json::from_value(item.clone()).into_iter().collect(),
        _ => Vec::new(),
    }
}

pub fn find_parameter<'a>(params: &'a [ResultParameter], key: &str) -> Option<&'a Value> {
    params.iter().find(|p| p.key == key).map(|p| &p.value)
}

pub fn find_parameter_string(params: &[ResultParameter], key: &str) -> Option<String> {
    find_parameter(params, key).and_then(value_as_string)
}
