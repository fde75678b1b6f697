//! Client SDK for the M-Pesa mobile-money gateway, plus an axum router that
//! receives the gateway's asynchronous callbacks.

pub mod client;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod validation;

pub use client::Mpesa;
pub use config::{Config, ConfigOptions, Environment, LoggingConfig, LoggingOverrides};
pub use errors::{describe_response_code, AuthErrorKind, MpesaError, Result};
pub use routes::callback_router;
pub use state::{CallbackSink, CallbackState, LoggingSink};
