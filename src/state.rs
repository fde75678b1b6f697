use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::models::{AccountBalanceEntry, B2cResult, StkCallback, TransactionStatusResponse};
use crate::services::C2bValidator;

/// Where parsed callbacks go. Every method defaults to logging the payload,
/// so implementors only override what they persist.
#[async_trait]
pub trait CallbackSink: Send + Sync {
    async fn stk_callback(&self, callback: StkCallback) -> anyhow::Result<()> {
        info!(
            "STK callback {:?}: code {:?} ({:?})",
            callback.checkout_request_id, callback.result_code, callback.result_desc
        );
        Ok(())
    }

    async fn b2c_result(&self, result: B2cResult) -> anyhow::Result<()> {
        info!(
            "B2C result {:?}: code {:?} ({:?})",
            result.originator_conversation_id, result.result_code, result.result_desc
        );
        Ok(())
    }

    async fn b2c_timeout(&self, result: B2cResult) -> anyhow::Result<()> {
        info!(
            "B2C timeout for {:?}: {:?}",
            result.originator_conversation_id, result.result_desc
        );
        Ok(())
    }

    async fn transaction_status(&self, response: TransactionStatusResponse) -> anyhow::Result<()> {
        info!(
            "Transaction status result: {:?} ({:?})",
            response.transaction_status(),
            response.result_desc()
        );
        Ok(())
    }

    async fn account_balance(
        &self,
        result: B2cResult,
        balances: Vec<AccountBalanceEntry>,
    ) -> anyhow::Result<()> {
        info!(
            "Account balance result {:?}: {} account(s)",
            result.conversation_id,
            balances.len()
        );
        Ok(())
    }

    async fn c2b_confirmation(&self, payload: Value) -> anyhow::Result<()> {
        info!("C2B confirmation stored: {}", payload);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

impl CallbackSink for LoggingSink {}

#[derive(Clone)]
pub struct CallbackState {
    pub sink: Arc<dyn CallbackSink>,
    pub validator: C2bValidator,
}

impl CallbackState {
    pub fn new() -> Self {
        CallbackState {
            sink: Arc::new(LoggingSink),
            validator: C2bValidator::new(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn CallbackSink>) -> Self {
        self.sink = sink;
        self
    }
}

impl Default for CallbackState {
    fn default() -> Self {
        Self::new()
    }
}
