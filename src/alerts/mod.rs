//! Threshold alerts for sensor readings
//!
//! A rule selects one metric and a user-entered threshold; readings at or
//! above it produce an [`AlertEvent`] which the [`Dispatcher`] delivers.

pub mod config;
pub mod evaluator;
pub mod notifier;

pub use config::{parse_threshold, AlertRule};
pub use evaluator::{evaluate, AlertEvent};
pub use notifier::{Dispatcher, LocalNotification, LogSink, NotificationSink, NotifierError, SmsTarget};
