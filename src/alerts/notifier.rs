//! Notification dispatch for fired alerts
//!
//! Delivery is best-effort. Each channel is attempted once; failures are
//! logged and never reach the caller, and a failure in one channel does not
//! stop the next.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::evaluator::AlertEvent;

pub const NOTIFICATION_TITLE: &str = "Hikonulit Alert";

/// Notification shown on the local device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalNotification {
    pub title: String,
    pub body: String,
}

/// Platform hook for immediate local notifications
pub trait NotificationSink: Send + Sync {
    /// Ask the platform for permission to show notifications
    fn request_permission(&self) -> Result<(), NotifierError> {
        Ok(())
    }

    fn show(&self, notification: &LocalNotification) -> Result<(), NotifierError>;
}

/// Sink that surfaces notifications through tracing
#[derive(Debug, Default, Clone)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn show(&self, notification: &LocalNotification) -> Result<(), NotifierError> {
        tracing::warn!(title = %notification.title, "{}", notification.body);
        Ok(())
    }
}

/// Where SMS alerts go: the relay endpoint and the destination number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmsTarget {
    pub relay_url: String,
    pub to: String,
}

#[derive(Serialize)]
struct SmsRequest<'a> {
    to: &'a str,
    message: &'a str,
}

/// Dispatcher for alert notifications
pub struct Dispatcher {
    client: reqwest::Client,
    sink: Arc<dyn NotificationSink>,
    sms: Option<SmsTarget>,
}

impl Dispatcher {
    /// Create a dispatcher that logs local notifications and sends no SMS
    pub fn new() -> Self {
        Self::with_sink(Arc::new(LogSink))
    }

    pub fn with_sink(sink: Arc<dyn NotificationSink>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            client,
            sink,
            sms: None,
        }
    }

    pub fn with_sms(mut self, target: Option<SmsTarget>) -> Self {
        self.sms = target;
        self
    }

    pub fn sms_target(&self) -> Option<&SmsTarget> {
        self.sms.as_ref()
    }

    /// Request notification permission once at startup. A denial is logged
    /// and returned as `false`; dispatch still attempts every channel.
    pub fn request_permission(&self) -> bool {
        match self.sink.request_permission() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Notification permission not granted");
                false
            }
        }
    }

    /// Show the local notification, then send the SMS if a target is set
    pub async fn dispatch(&self, event: &AlertEvent) {
        if let Err(e) = self.notify_local(event) {
            tracing::error!(error = %e, "Failed to show local notification");
        }

        match &self.sms {
            Some(target) => {
                if let Err(e) = self.send_sms(target, event).await {
                    tracing::error!(error = %e, "Failed to send SMS alert");
                }
            }
            None => {
                tracing::info!("SMS relay not configured, skipping SMS");
            }
        }
    }

    fn notify_local(&self, event: &AlertEvent) -> Result<(), NotifierError> {
        let notification = LocalNotification {
            title: NOTIFICATION_TITLE.to_string(),
            body: event.notification_text(),
        };
        self.sink.show(&notification)
    }

    async fn send_sms(&self, target: &SmsTarget, event: &AlertEvent) -> Result<(), NotifierError> {
        let message = event.sms_text();
        let response = self
            .client
            .post(&target.relay_url)
            .json(&SmsRequest {
                to: &target.to,
                message: &message,
            })
            .send()
            .await
            .map_err(|e| NotifierError::Sms(format!("Failed to reach relay: {}", e)))?;

        if !response.status().is_success() {
            return Err(NotifierError::Sms(format!(
                "Relay returned status {}",
                response.status()
            )));
        }

        tracing::debug!(
            device_id = %event.device_id,
            relay = %target.relay_url,
            "SMS alert sent"
        );

        Ok(())
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Notifier errors
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Local notification error: {0}")]
    Local(String),

    #[error("SMS error: {0}")]
    Sms(String),
}
