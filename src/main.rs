use anyhow::Context;
use axum::Router;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

use mpesa_sdk::{callback_router, logging, CallbackState, Config};

const DEFAULT_PORT: u16 = 8080;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load M-Pesa configuration")?;
    let _log_guard = logging::init_logging(config.logging()).context("Failed to set up logging")?;

    tracing::info!(
        "Starting callback receiver ({} environment, shortcode {})",
        config.environment(),
        config.shortcode()
    );

    let app = build_router(CallbackState::new());
    start_server(app).await
}

fn build_router(state: CallbackState) -> Router {
    callback_router(state).layer(TraceLayer::new_for_http())
}

async fn start_server(app: Router) -> anyhow::Result<()> {
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Callback receiver listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
