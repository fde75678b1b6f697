// handlers/callbacks.rs
use axum::{extract::State, response::Json};
use bytes::Bytes;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::models::{parse_balance_result, B2cResult, C2bReceiverReply, StkCallback};
use crate::services::TransactionStatusService;
use crate::state::CallbackState;

// The gateway redelivers anything that is not a 200, so every handler answers
// 200 and reports failures in the body.

fn ack() -> Json<Value> {
    Json(json!({
        "ResultCode": 0,
        "ResultDesc": "Success"
    }))
}

fn failure(desc: impl Into<String>) -> Json<Value> {
    Json(json!({
        "ResultCode": 1,
        "ResultDesc": desc.into()
    }))
}

fn parse_body(kind: &str, body: &Bytes) -> Result<Value, Json<Value>> {
    serde_json::from_slice(body).map_err(|e| {
        error!("Rejected {} callback with invalid JSON: {}", kind, e);
        failure(format!("Invalid JSON payload: {}", e))
    })
}

fn finish(kind: &str, outcome: anyhow::Result<()>) -> Json<Value> {
    match outcome {
        Ok(()) => ack(),
        Err(e) => {
            error!("Failed to process {} callback: {:#}", kind, e);
            failure(format!("Failed to process callback: {}", e))
        }
    }
}

pub async fn stk_callback(State(state): State<CallbackState>, body: Bytes) -> Json<Value> {
    let payload = match parse_body("STK", &body) {
        Ok(payload) => payload,
        Err(reply) => return reply,
    };
    let callback = match StkCallback::parse(&payload) {
        Ok(callback) => callback,
        Err(e) => {
            warn!("Malformed STK callback: {}", e);
            return failure(e.to_string());
        }
    };

    if callback.is_successful() {
        info!(
            "STK payment confirmed: receipt {:?}, amount {:?}",
            callback.mpesa_receipt_number(),
            callback.amount()
        );
    } else if callback.is_cancelled_by_user() {
        info!("STK payment cancelled by user: {:?}", callback.checkout_request_id);
    } else {
        warn!(
            "STK payment failed with code {:?}: {:?}",
            callback.result_code, callback.result_desc
        );
    }

    finish("STK", state.sink.stk_callback(callback).await)
}

pub async fn b2c_result(State(state): State<CallbackState>, body: Bytes) -> Json<Value> {
    let payload = match parse_body("B2C result", &body) {
        Ok(payload) => payload,
        Err(reply) => return reply,
    };
    let result = match B2cResult::parse(&payload) {
        Ok(result) => result,
        Err(e) => {
            warn!("Malformed B2C result: {}", e);
            return failure(e.to_string());
        }
    };

    if result.is_successful() {
        info!(
            "B2C payment {:?} completed: {:?}",
            result.transaction_id,
            result.transaction_amount()
        );
    } else {
        warn!("B2C payment failed: {}", result.detailed_error());
    }

    finish("B2C result", state.sink.b2c_result(result).await)
}

pub async fn b2c_timeout(State(state): State<CallbackState>, body: Bytes) -> Json<Value> {
    let payload = match parse_body("B2C timeout", &body) {
        Ok(payload) => payload,
        Err(reply) => return reply,
    };
    let result = match B2cResult::parse(&payload) {
        Ok(result) => result,
        Err(e) => {
            warn!("Malformed B2C timeout: {}", e);
            return failure(e.to_string());
        }
    };

    warn!("B2C request timed out: {:?}", result.originator_conversation_id);
    finish("B2C timeout", state.sink.b2c_timeout(result).await)
}

pub async fn transaction_status_result(
    State(state): State<CallbackState>,
    body: Bytes,
) -> Json<Value> {
    let payload = match parse_body("transaction status", &body) {
        Ok(payload) => payload,
        Err(reply) => return reply,
    };
    let response = match TransactionStatusService::parse_callback(payload) {
        Ok(response) => response,
        Err(e) => {
            warn!("Malformed transaction status result: {}", e);
            return failure(e.to_string());
        }
    };

    finish(
        "transaction status",
        state.sink.transaction_status(response).await,
    )
}

pub async fn account_balance_result(
    State(state): State<CallbackState>,
    body: Bytes,
) -> Json<Value> {
    let payload = match parse_body("account balance", &body) {
        Ok(payload) => payload,
        Err(reply) => return reply,
    };
    let parsed = B2cResult::parse(&payload)
        .and_then(|result| parse_balance_result(&payload).map(|balances| (result, balances)));
    let (result, balances) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Malformed account balance result: {}", e);
            return failure(e.to_string());
        }
    };

    finish(
        "account balance",
        state.sink.account_balance(result, balances).await,
    )
}

pub async fn c2b_validation(
    State(state): State<CallbackState>,
    body: Bytes,
) -> Json<C2bReceiverReply> {
    let payload = serde_json::from_slice::<Value>(&body).unwrap_or_else(|e| {
        error!("C2B validation request was not valid JSON: {}", e);
        Value::Object(Default::default())
    });
    Json(state.validator.handle_validation(&payload))
}

pub async fn c2b_confirmation(
    State(state): State<CallbackState>,
    body: Bytes,
) -> Json<C2bReceiverReply> {
    let payload = serde_json::from_slice::<Value>(&body).unwrap_or_else(|e| {
        error!("C2B confirmation was not valid JSON: {}", e);
        Value::String(String::from_utf8_lossy(&body).into_owned())
    });
    let reply = state.validator.handle_confirmation(&payload);
    if let Err(e) = state.sink.c2b_confirmation(payload).await {
        error!("Failed to store C2B confirmation: {:#}", e);
    }
    Json(reply)
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "mpesa-callbacks",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
