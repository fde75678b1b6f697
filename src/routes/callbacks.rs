use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::callbacks;
use crate::state::CallbackState;

pub fn callback_routes() -> Router<CallbackState> {
    Router::new()
        .route("/health", get(callbacks::health))
        // STK push
        .route("/stk/callback", post(callbacks::stk_callback))
        // B2C
        .route("/b2c/result", post(callbacks::b2c_result))
        .route("/b2c/timeout", post(callbacks::b2c_timeout))
        // Queries
        .route(
            "/transaction-status/result",
            post(callbacks::transaction_status_result),
        )
        .route(
            "/account-balance/result",
            post(callbacks::account_balance_result),
        )
        // C2B
        .route("/c2b/validation", post(callbacks::c2b_validation))
        .route("/c2b/confirmation", post(callbacks::c2b_confirmation))
}

/// Callback router with its state applied, ready to serve or nest.
pub fn callback_router(state: CallbackState) -> Router {
    callback_routes().with_state(state)
}
