//! Hikonulit monitor
//!
//! Subscribes to the readings table, keeps the latest value and recent
//! history, and alerts when the selected metric reaches the threshold.
//!
//! Run with: cargo run --bin hikonulit-monitor
//!
//! Environment variables:
//! - SUPABASE_URL or EXPO_PUBLIC_SUPABASE_URL: Hosted backend URL
//! - SUPABASE_ANON_KEY or EXPO_PUBLIC_SUPABASE_ANON_KEY: Anonymous API key
//! - HIKONULIT_TABLE: Readings table (default: s3_sensor_data)
//! - HIKONULIT_METRIC: heart_rate, spo2, accel_mag, temperature or humidity (default: heart_rate)
//! - HIKONULIT_THRESHOLD: Alert threshold (default: 100)
//! - HIKONULIT_SMS_RELAY_URL, HIKONULIT_SMS_TO: Relay endpoint and recipient; SMS is off unless both are set
//! - RUST_LOG: Log level (default: info)

use std::sync::Arc;

use hikonulit::alerts::Dispatcher;
use hikonulit::monitor::{Monitor, MonitorConfig};
use hikonulit::realtime::{RealtimeClient, TableClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hikonulit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = MonitorConfig::from_env()?;

    tracing::info!("Hikonulit monitor v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("  Backend: {}", config.backend.url);
    tracing::info!("  Table: {}", config.table);
    tracing::info!(
        "  Rule: {} ({}) >= {}",
        config.rule.metric,
        config.rule.metric.label(),
        config.rule.threshold
    );
    if config.rule.threshold_value().is_none() {
        tracing::warn!("  Threshold is not a number; alerts are disabled");
    }
    match &config.sms {
        Some(target) => tracing::info!("  SMS: {} via {}", target.to, target.relay_url),
        None => tracing::info!("  SMS: DISABLED"),
    }

    let dispatcher = Dispatcher::new().with_sms(config.sms.clone());
    dispatcher.request_permission();
    let monitor = Arc::new(Monitor::new(config.rule.clone(), dispatcher));

    // Initial state is display-only; failures here do not stop the subscription
    let table_client = TableClient::new(config.backend.clone())?;
    match monitor.load_initial(&table_client, &config.table).await {
        Ok(count) => tracing::info!("Loaded {} recent readings", count),
        Err(e) => tracing::error!(error = %e, "Failed to fetch history"),
    }
    if let Some(latest) = monitor.latest() {
        tracing::info!(
            device_id = %latest.device_id,
            value = ?latest.metric(config.rule.metric),
            risk = ?latest.risk(),
            "Latest reading"
        );
    }

    let subscription = RealtimeClient::new(config.backend.clone())
        .subscribe(&config.table, monitor.reading_handler())
        .await?;

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");

    tracing::info!("Shutdown signal received");
    subscription.unsubscribe().await;

    Ok(())
}
