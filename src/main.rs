//! Hikonulit SMS relay
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - HOST: Bind address (default: 0.0.0.0)
//! - PORT: Port number (default: 3000)
//! - TWILIO_ACCOUNT_SID or TWILIO_SID: Provider account
//! - TWILIO_AUTH_TOKEN or TWILIO_TOKEN: Provider auth token
//! - TWILIO_FROM or TWILIO_PHONE: Sender number
//! - TWILIO_API_BASE: Provider base URL (default: https://api.twilio.com)
//! - RUST_LOG: Log level (default: info)
//!
//! Without credentials the relay still starts but answers `/send` with 503.

use hikonulit::api::run_server;
use hikonulit::RelayConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hikonulit=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RelayConfig::from_env()?;

    tracing::info!("Hikonulit relay v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("  Listen: {}:{}", config.host, config.port);
    tracing::info!("  Provider: {}", config.api_base);
    match &config.credentials {
        Some(credentials) => {
            tracing::info!("  Account: {}", credentials.account_sid);
            tracing::info!("  Sender: {}", credentials.from);
        }
        None => tracing::info!("  Credentials: NOT SET"),
    }

    run_server(config).await
}
