//! Alert configuration types

use serde::{Deserialize, Serialize};

use crate::data::{Metric, UnknownMetric};

/// Alert rule: the selected metric and the threshold exactly as the user typed it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub metric: Metric,
    pub threshold: String,
}

impl AlertRule {
    pub fn new(metric: Metric, threshold: impl Into<String>) -> Self {
        Self {
            metric,
            threshold: threshold.into(),
        }
    }

    /// Build a rule from a metric name, rejecting names outside the fixed set
    pub fn parse(metric: &str, threshold: impl Into<String>) -> Result<Self, UnknownMetric> {
        Ok(Self::new(metric.parse()?, threshold))
    }

    /// Numeric threshold, or `None` when the text is not a finite number
    pub fn threshold_value(&self) -> Option<f64> {
        parse_threshold(&self.threshold)
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_threshold(mut self, threshold: impl Into<String>) -> Self {
        self.threshold = threshold.into();
        self
    }
}

impl Default for AlertRule {
    fn default() -> Self {
        Self::new(Metric::HeartRate, "100")
    }
}

/// Parse user-entered threshold text. Blank text does not count as zero.
pub fn parse_threshold(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|t| t.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_threshold() {
        assert_eq!(parse_threshold("100"), Some(100.0));
        assert_eq!(parse_threshold(" 36.5 "), Some(36.5));
        assert_eq!(parse_threshold("-4"), Some(-4.0));
        assert_eq!(parse_threshold(""), None);
        assert_eq!(parse_threshold("   "), None);
        assert_eq!(parse_threshold("abc"), None);
        assert_eq!(parse_threshold("inf"), None);
        assert_eq!(parse_threshold("NaN"), None);
    }

    #[test]
    fn test_rule_builder() {
        let rule = AlertRule::default()
            .with_metric(Metric::Spo2)
            .with_threshold("95");

        assert_eq!(rule.metric, Metric::Spo2);
        assert_eq!(rule.threshold_value(), Some(95.0));
    }

    #[test]
    fn test_rule_parse_rejects_unknown_metric() {
        assert!(AlertRule::parse("heart_rate", "100").is_ok());
        assert!(AlertRule::parse("blood_pressure", "100").is_err());
    }
}
