//! Hikonulit: sensor reading alerts with an SMS relay
//!
//! Two processes share this crate:
//!
//! - **Relay** (`hikonulit-relay`): a single `POST /send` endpoint that
//!   authenticates to the messaging provider and forwards the message,
//!   passing the provider's reply straight back.
//! - **Monitor** (`hikonulit-monitor`): subscribes to row changes on the
//!   readings table, keeps the latest reading and a bounded history, and
//!   raises a local notification (plus an optional SMS through the relay)
//!   whenever the selected metric reaches the threshold.
//!
//! # Example
//!
//! ```no_run
//! use hikonulit::alerts::{evaluate, AlertRule};
//! use hikonulit::data::{Metric, SensorReading};
//!
//! let rule = AlertRule::parse("heart_rate", "100").unwrap();
//! let reading = SensorReading::new("demo-device-1").with_metric(Metric::HeartRate, 125.0);
//!
//! if let Some(event) = evaluate(&rule, &reading) {
//!     println!("{}", event.notification_text()); // heart_rate 125 ≥ 100
//! }
//! ```

pub mod alerts;
pub mod api;
pub mod data;
pub mod env;
pub mod monitor;
pub mod realtime;
pub mod sms;

// Re-export commonly used types
pub use alerts::{evaluate, AlertEvent, AlertRule, Dispatcher};
pub use data::{Metric, SensorReading};
pub use monitor::{Monitor, MonitorConfig};
pub use sms::RelayConfig;
