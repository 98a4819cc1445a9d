use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric metrics carried by a sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    HeartRate,
    Spo2,
    AccelMag,
    Temperature,
    Humidity,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::HeartRate,
        Metric::Spo2,
        Metric::AccelMag,
        Metric::Temperature,
        Metric::Humidity,
    ];

    /// Column name in the readings table
    pub fn key(&self) -> &'static str {
        match self {
            Metric::HeartRate => "heart_rate",
            Metric::Spo2 => "spo2",
            Metric::AccelMag => "accel_mag",
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Metric::HeartRate => "Heart Rate",
            Metric::Spo2 => "SpO2",
            Metric::AccelMag => "Accel Mag",
            Metric::Temperature => "Temperature",
            Metric::Humidity => "Humidity",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.key() == s)
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Unknown metric '{0}' (expected one of heart_rate, spo2, accel_mag, temperature, humidity)")]
pub struct UnknownMetric(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_metrics() {
        for metric in Metric::ALL {
            assert_eq!(metric.key().parse::<Metric>().unwrap(), metric);
        }
    }

    #[test]
    fn test_parse_unknown_metric() {
        let err = "pulse".parse::<Metric>().unwrap_err();
        assert_eq!(err, UnknownMetric("pulse".to_string()));
        assert!("Heart Rate".parse::<Metric>().is_err());
    }

    #[test]
    fn test_display_uses_column_name() {
        assert_eq!(Metric::Spo2.to_string(), "spo2");
        assert_eq!(Metric::AccelMag.label(), "Accel Mag");
    }
}
