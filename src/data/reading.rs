use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metric::Metric;

/// A JSON row as delivered by the hosted backend
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Risk tag stored alongside each reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    High,
    Low,
}

impl RiskLevel {
    /// High when heart rate exceeds 120 bpm or SpO2 drops below 90%
    pub fn derive(heart_rate: Option<f64>, spo2: Option<f64>) -> Self {
        let tachycardic = heart_rate.map(|hr| hr > 120.0).unwrap_or(false);
        let hypoxic = spo2.map(|s| s < 90.0).unwrap_or(false);
        if tachycardic || hypoxic {
            RiskLevel::High
        } else {
            RiskLevel::Low
        }
    }

    fn from_json(json: &serde_json::Value) -> Option<Self> {
        match json.as_str()?.trim().to_ascii_lowercase().as_str() {
            "high" => Some(RiskLevel::High),
            "low" => Some(RiskLevel::Low),
            _ => None,
        }
    }
}

/// One sensor data record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    pub id: Option<i64>,
    pub device_id: String,
    pub heart_rate: Option<f64>,
    pub spo2: Option<f64>,
    pub accel_mag: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub created_at: Option<DateTime<Utc>>,
    pub prediction_label: Option<String>,
    pub risk_level: Option<RiskLevel>,
}

impl SensorReading {
    /// Create a reading with no metrics set
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            id: None,
            device_id: device_id.into(),
            heart_rate: None,
            spo2: None,
            accel_mag: None,
            temperature: None,
            humidity: None,
            created_at: None,
            prediction_label: None,
            risk_level: None,
        }
    }

    pub fn with_metric(mut self, metric: Metric, value: f64) -> Self {
        *self.slot_mut(metric) = Some(value).filter(|v| v.is_finite());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Decode a backend row.
    ///
    /// Metrics are coerced leniently: numbers and numeric strings are kept,
    /// anything else reads as absent. Only a missing or empty `device_id`
    /// rejects the row.
    pub fn from_record(record: &Record) -> Result<Self, ReadingError> {
        let device_id = match record.get("device_id") {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => return Err(ReadingError::MissingDeviceId),
        };

        let mut reading = SensorReading::new(device_id);
        for metric in Metric::ALL {
            *reading.slot_mut(metric) = record.get(metric.key()).and_then(coerce_f64);
        }

        reading.id = record.get("id").and_then(|v| v.as_i64());
        reading.created_at = record.get("created_at").and_then(parse_timestamp);
        reading.prediction_label = record
            .get("prediction_label")
            .and_then(|v| v.as_str())
            .map(String::from);
        reading.risk_level = record.get("risk_level").and_then(RiskLevel::from_json);

        Ok(reading)
    }

    /// Value of the given metric, if present
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::HeartRate => self.heart_rate,
            Metric::Spo2 => self.spo2,
            Metric::AccelMag => self.accel_mag,
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
        }
    }

    /// Stored risk tag, or one derived from the vitals when absent
    pub fn risk(&self) -> RiskLevel {
        self.risk_level
            .unwrap_or_else(|| RiskLevel::derive(self.heart_rate, self.spo2))
    }

    fn slot_mut(&mut self, metric: Metric) -> &mut Option<f64> {
        match metric {
            Metric::HeartRate => &mut self.heart_rate,
            Metric::Spo2 => &mut self.spo2,
            Metric::AccelMag => &mut self.accel_mag,
            Metric::Temperature => &mut self.temperature,
            Metric::Humidity => &mut self.humidity,
        }
    }
}

/// Coerce a JSON scalar to a finite f64
pub fn coerce_f64(json: &serde_json::Value) -> Option<f64> {
    let value = match json {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

/// Accepts RFC 3339 as well as the zone-less form Postgres emits for
/// `timestamp` columns (read as UTC).
fn parse_timestamp(json: &serde_json::Value) -> Option<DateTime<Utc>> {
    let s = json.as_str()?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReadingError {
    #[error("Record has no device_id")]
    MissingDeviceId,
}
