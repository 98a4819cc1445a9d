//! Headless dashboard: keeps the latest reading and a bounded history,
//! and runs every incoming reading through the alert rule.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::alerts::{evaluate, AlertEvent, AlertRule, Dispatcher, SmsTarget};
use crate::data::{Metric, SensorReading};
use crate::env::{first_set, process_env, ConfigError, Lookup};
use crate::realtime::{BackendConfig, ReadingHandler, RealtimeError, TableClient, HISTORY_LIMIT};

/// Readings kept in memory, newest first
pub const HISTORY_CAPACITY: usize = 200;

pub const DEFAULT_TABLE: &str = "s3_sensor_data";

/// Monitor configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub backend: BackendConfig,
    pub table: String,
    pub rule: AlertRule,
    /// SMS is skipped when unset
    pub sms: Option<SmsTarget>,
}

impl MonitorConfig {
    /// Create a monitor config from environment variables
    /// SUPABASE_URL / SUPABASE_ANON_KEY (see [`BackendConfig`])
    /// HIKONULIT_TABLE=s3_sensor_data
    /// HIKONULIT_METRIC=heart_rate
    /// HIKONULIT_THRESHOLD=100
    /// HIKONULIT_SMS_RELAY_URL=http://localhost:3000/send
    /// HIKONULIT_SMS_TO=+15551234567
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        let backend = BackendConfig::from_lookup(lookup)?;
        let table = first_set(lookup, &["HIKONULIT_TABLE"]).unwrap_or_else(|| DEFAULT_TABLE.to_string());

        let defaults = AlertRule::default();
        let metric = match first_set(lookup, &["HIKONULIT_METRIC"]) {
            Some(name) => name.parse::<Metric>().map_err(|_| ConfigError::Invalid {
                key: "HIKONULIT_METRIC",
                value: name,
            })?,
            None => defaults.metric,
        };
        // Kept as text: an unparsable threshold disables alerts, it is not fatal
        let threshold = lookup("HIKONULIT_THRESHOLD").unwrap_or(defaults.threshold);

        let sms = match (
            first_set(lookup, &["HIKONULIT_SMS_RELAY_URL"]),
            first_set(lookup, &["HIKONULIT_SMS_TO"]),
        ) {
            (Some(relay_url), Some(to)) => Some(SmsTarget { relay_url, to }),
            _ => None,
        };

        Ok(Self {
            backend,
            table,
            rule: AlertRule::new(metric, threshold),
            sms,
        })
    }
}

/// Dashboard state shared with the subscription callback
pub struct Monitor {
    rule: RwLock<AlertRule>,
    latest: RwLock<Option<SensorReading>>,
    history: RwLock<VecDeque<SensorReading>>,
    dispatcher: Arc<Dispatcher>,
}

impl Monitor {
    pub fn new(rule: AlertRule, dispatcher: Dispatcher) -> Self {
        Self {
            rule: RwLock::new(rule),
            latest: RwLock::new(None),
            history: RwLock::new(VecDeque::with_capacity(HISTORY_CAPACITY)),
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn rule(&self) -> AlertRule {
        self.rule.read().clone()
    }

    pub fn set_metric(&self, metric: Metric) {
        self.rule.write().metric = metric;
    }

    pub fn set_threshold(&self, threshold: impl Into<String>) {
        self.rule.write().threshold = threshold.into();
    }

    pub fn latest(&self) -> Option<SensorReading> {
        self.latest.read().clone()
    }

    /// Recent readings, newest first
    pub fn history(&self) -> Vec<SensorReading> {
        self.history.read().iter().cloned().collect()
    }

    /// Replace history with rows fetched from the backend (newest first)
    pub fn load_history(&self, rows: Vec<SensorReading>) {
        let mut history = self.history.write();
        history.clear();
        history.extend(rows.into_iter().take(HISTORY_CAPACITY));
        if let Some(first) = history.front() {
            *self.latest.write() = Some(first.clone());
        }
    }

    /// Fetch recent rows and the latest reading for display. Nothing is
    /// evaluated, so a restart does not re-alert on rows already seen.
    pub async fn load_initial(&self, client: &TableClient, table: &str) -> Result<usize, RealtimeError> {
        let rows = client.fetch_recent(table, HISTORY_LIMIT).await?;
        let count = rows.len();
        self.load_history(rows);
        Ok(count)
    }

    /// Record a new reading and alert on it.
    ///
    /// Delivery is spawned on the current tokio runtime and not awaited; the
    /// returned event only reports that the rule fired. Outside a runtime the
    /// event is still returned but nothing is delivered.
    pub fn ingest(&self, reading: SensorReading) -> Option<AlertEvent> {
        *self.latest.write() = Some(reading.clone());
        {
            let mut history = self.history.write();
            history.push_front(reading.clone());
            history.truncate(HISTORY_CAPACITY);
        }
        self.check(&reading)
    }

    /// Fetch the newest row and run it through the rule. Explicit trigger only.
    pub async fn manual_check(
        &self,
        client: &TableClient,
        table: &str,
    ) -> Result<Option<AlertEvent>, RealtimeError> {
        if let Some(reading) = client.fetch_latest(table).await? {
            *self.latest.write() = Some(reading);
        }
        Ok(self.latest().and_then(|reading| self.check(&reading)))
    }

    /// Callback for a realtime subscription feeding this monitor
    pub fn reading_handler(self: &Arc<Self>) -> ReadingHandler {
        let monitor = Arc::clone(self);
        Arc::new(move |reading: SensorReading| {
            monitor.ingest(reading);
        })
    }

    fn check(&self, reading: &SensorReading) -> Option<AlertEvent> {
        let rule = self.rule();
        let event = evaluate(&rule, reading)?;

        tracing::info!(
            device_id = %event.device_id,
            metric = %event.metric,
            value = event.value,
            threshold = event.threshold,
            "Threshold reached"
        );

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let dispatcher = Arc::clone(&self.dispatcher);
                let pending = event.clone();
                handle.spawn(async move {
                    dispatcher.dispatch(&pending).await;
                });
            }
            Err(_) => {
                tracing::warn!(device_id = %event.device_id, "No tokio runtime, alert not delivered");
            }
        }

        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{LocalNotification, NotificationSink, NotifierError};
    use crate::env::map_lookup;
    use axum::{routing::get, Json, Router};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    struct ChannelSink(mpsc::UnboundedSender<LocalNotification>);

    impl NotificationSink for ChannelSink {
        fn show(&self, notification: &LocalNotification) -> Result<(), NotifierError> {
            let _ = self.0.send(notification.clone());
            Ok(())
        }
    }

    fn monitor() -> (Monitor, mpsc::UnboundedReceiver<LocalNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::with_sink(Arc::new(ChannelSink(tx)));
        (Monitor::new(AlertRule::default(), dispatcher), rx)
    }

    fn reading(id: i64, hr: f64) -> SensorReading {
        let mut r = SensorReading::new("demo-device-1").with_metric(Metric::HeartRate, hr);
        r.id = Some(id);
        r
    }

    #[tokio::test]
    async fn test_ingest_alerts_and_notifies() {
        let (monitor, mut notifications) = monitor();

        let event = monitor.ingest(reading(1, 125.0)).unwrap();
        assert_eq!(event.value, 125.0);

        let shown = notifications.recv().await.unwrap();
        assert!(shown.body.contains("heart_rate 125 ≥ 100"));
        assert_eq!(monitor.latest().unwrap().id, Some(1));
    }

    #[tokio::test]
    async fn test_ingest_below_threshold_is_quiet() {
        let (monitor, mut notifications) = monitor();

        assert!(monitor.ingest(reading(1, 60.0)).is_none());
        assert_eq!(monitor.history().len(), 1);

        tokio::task::yield_now().await;
        assert!(notifications.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_rule_changes_apply_to_next_reading() {
        let (monitor, _notifications) = monitor();

        monitor.set_threshold("not a number");
        assert!(monitor.ingest(reading(1, 500.0)).is_none());

        monitor.set_threshold("50");
        assert!(monitor.ingest(reading(2, 60.0)).is_some());

        monitor.set_metric(Metric::Spo2);
        assert!(monitor.ingest(reading(3, 60.0)).is_none());
    }

    #[tokio::test]
    async fn test_history_newest_first_and_capped() {
        let (monitor, _notifications) = monitor();
        monitor.set_threshold("1000");

        for id in 0..(HISTORY_CAPACITY as i64 + 25) {
            monitor.ingest(reading(id, 70.0));
        }

        let history = monitor.history();
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history[0].id, Some(HISTORY_CAPACITY as i64 + 24));
        assert_eq!(history.last().unwrap().id, Some(25));
    }

    #[test]
    fn test_load_history_sets_latest() {
        let monitor = Monitor::new(AlertRule::default(), Dispatcher::new());
        monitor.load_history(vec![reading(9, 70.0), reading(8, 71.0)]);

        assert_eq!(monitor.latest().unwrap().id, Some(9));
        assert_eq!(monitor.history().len(), 2);
    }

    #[test]
    fn test_ingest_outside_runtime_does_not_panic() {
        let monitor = Monitor::new(AlertRule::default(), Dispatcher::new());

        let event = monitor.ingest(reading(1, 125.0));

        assert!(event.is_some());
        assert_eq!(monitor.latest().unwrap().id, Some(1));
    }

    /// Local stand-in for the REST interface with an over-threshold newest row
    async fn spawn_backend() -> String {
        let app = Router::new().route(
            "/rest/v1/s3_sensor_data",
            get(|| async {
                Json(serde_json::json!([
                    {"id": 2, "device_id": "demo-device-1", "heart_rate": 125},
                    {"id": 1, "device_id": "demo-device-1", "heart_rate": 70}
                ]))
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_load_initial_does_not_alert() {
        let (monitor, mut notifications) = monitor();
        let client = TableClient::new(BackendConfig::new(spawn_backend().await, "anon")).unwrap();

        let count = monitor.load_initial(&client, DEFAULT_TABLE).await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(monitor.latest().unwrap().id, Some(2));
        tokio::task::yield_now().await;
        assert!(notifications.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_manual_check_alerts_on_latest() {
        let (monitor, mut notifications) = monitor();
        let client = TableClient::new(BackendConfig::new(spawn_backend().await, "anon")).unwrap();

        let event = monitor.manual_check(&client, DEFAULT_TABLE).await.unwrap().unwrap();

        assert_eq!(event.value, 125.0);
        assert!(notifications.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_reading_handler_feeds_monitor() {
        let (monitor, mut notifications) = monitor();
        let monitor = Arc::new(monitor);

        let handler = monitor.reading_handler();
        handler(reading(4, 130.0));

        assert!(notifications.recv().await.is_some());
        assert_eq!(monitor.latest().unwrap().id, Some(4));
    }

    #[test]
    fn test_config_from_lookup() {
        let config = MonitorConfig::from_lookup(&map_lookup(&[
            ("SUPABASE_URL", "https://x.supabase.co"),
            ("SUPABASE_ANON_KEY", "key"),
            ("HIKONULIT_METRIC", "spo2"),
            ("HIKONULIT_THRESHOLD", "95"),
        ]))
        .unwrap();

        assert_eq!(config.table, DEFAULT_TABLE);
        assert_eq!(config.rule, AlertRule::new(Metric::Spo2, "95"));
        assert!(config.sms.is_none());
    }

    #[test]
    fn test_config_sms_needs_both_values() {
        let base = [
            ("SUPABASE_URL", "https://x.supabase.co"),
            ("SUPABASE_ANON_KEY", "key"),
            ("HIKONULIT_SMS_RELAY_URL", "http://localhost:3000/send"),
        ];
        let config = MonitorConfig::from_lookup(&map_lookup(&base)).unwrap();
        assert!(config.sms.is_none());

        let mut full = base.to_vec();
        full.push(("HIKONULIT_SMS_TO", "+15551234567"));
        let config = MonitorConfig::from_lookup(&map_lookup(&full)).unwrap();
        assert_eq!(config.sms.unwrap().to, "+15551234567");
    }

    #[test]
    fn test_config_rejects_unknown_metric() {
        let err = MonitorConfig::from_lookup(&map_lookup(&[
            ("SUPABASE_URL", "https://x.supabase.co"),
            ("SUPABASE_ANON_KEY", "key"),
            ("HIKONULIT_METRIC", "pulse"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "HIKONULIT_METRIC", .. }));
    }
}
