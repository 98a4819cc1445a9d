//! Threshold evaluation for incoming readings

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::config::AlertRule;
use crate::data::{Metric, SensorReading};

/// A reading that crossed the configured threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub metric: Metric,
    pub value: f64,
    pub threshold: f64,
    pub device_id: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl AlertEvent {
    /// Body of the local notification, e.g. `heart_rate 125 ≥ 100`
    pub fn notification_text(&self) -> String {
        format!("{} {} ≥ {}", self.metric, self.value, self.threshold)
    }

    /// Body of the outbound SMS
    pub fn sms_text(&self) -> String {
        let at = self
            .created_at
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(|| "unknown time".to_string());
        format!("Alert: {} {} at {}", self.metric, self.value, at)
    }
}

/// Evaluate a reading against a rule.
///
/// Fires when the selected metric is greater than or equal to the threshold.
/// A missing metric or an unparsable threshold yields `None` rather than an
/// error. There is no suppression: every qualifying reading fires again.
pub fn evaluate(rule: &AlertRule, reading: &SensorReading) -> Option<AlertEvent> {
    let threshold = rule.threshold_value()?;
    let value = reading.metric(rule.metric)?;

    if value >= threshold {
        Some(AlertEvent {
            metric: rule.metric,
            value,
            threshold,
            device_id: reading.device_id.clone(),
            created_at: reading.created_at,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reading(hr: f64) -> SensorReading {
        SensorReading::new("demo-device-1").with_metric(Metric::HeartRate, hr)
    }

    #[test]
    fn test_fires_at_or_above_threshold() {
        let rule = AlertRule::new(Metric::HeartRate, "100");

        let event = evaluate(&rule, &reading(125.0)).unwrap();
        assert_eq!(event.value, 125.0);
        assert_eq!(event.threshold, 100.0);
        assert_eq!(event.device_id, "demo-device-1");
        assert!(event.notification_text().contains("heart_rate 125 ≥ 100"));

        assert!(evaluate(&rule, &reading(100.0)).is_some());
        assert!(evaluate(&rule, &reading(99.9)).is_none());
    }

    #[test]
    fn test_every_qualifying_reading_fires() {
        let rule = AlertRule::new(Metric::HeartRate, "100");
        let r = reading(130.0);
        assert!(evaluate(&rule, &r).is_some());
        assert!(evaluate(&rule, &r).is_some());
    }

    #[test]
    fn test_missing_metric_is_noop() {
        let rule = AlertRule::new(Metric::Temperature, "30");
        assert!(evaluate(&rule, &reading(150.0)).is_none());
    }

    #[test]
    fn test_bad_threshold_is_noop() {
        for threshold in ["", "abc", "1e400", "NaN"] {
            let rule = AlertRule::new(Metric::HeartRate, threshold);
            assert!(evaluate(&rule, &reading(150.0)).is_none(), "{threshold}");
        }
    }

    #[test]
    fn test_fractional_values_formatted() {
        let rule = AlertRule::new(Metric::Temperature, "37.5");
        let r = SensorReading::new("d").with_metric(Metric::Temperature, 38.25);
        let event = evaluate(&rule, &r).unwrap();
        assert_eq!(event.notification_text(), "temperature 38.25 ≥ 37.5");
    }

    #[test]
    fn test_sms_text() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let rule = AlertRule::new(Metric::HeartRate, "100");
        let event = evaluate(&rule, &reading(125.0).with_created_at(ts)).unwrap();
        assert_eq!(
            event.sms_text(),
            "Alert: heart_rate 125 at 2024-05-01T10:00:00+00:00"
        );

        let event = evaluate(&rule, &reading(125.0)).unwrap();
        assert_eq!(event.sms_text(), "Alert: heart_rate 125 at unknown time");
    }
}
