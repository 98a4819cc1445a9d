use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{health_check, send_sms, AppState};
use crate::sms::{MessagingProvider, RelayConfig};

impl AppState {
    /// Build handler state from config; no credentials means no provider
    pub fn from_config(config: &RelayConfig) -> Result<Self, crate::sms::ProviderError> {
        let provider = match &config.credentials {
            Some(credentials) => Some(MessagingProvider::new(
                config.api_base.clone(),
                credentials.clone(),
            )?),
            None => None,
        };
        Ok(Self { provider })
    }
}

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/send", post(send_sms))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the relay HTTP server
pub async fn run_server(config: RelayConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.credentials.is_none() {
        tracing::warn!(
            "SMS provider credentials not set. Set TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN and TWILIO_FROM to enable sending SMS."
        );
    }

    let state = Arc::new(AppState::from_config(&config)?);
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("SMS relay listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("SMS relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");

    tracing::info!("Shutdown signal received");
}
