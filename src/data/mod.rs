pub mod metric;
pub mod reading;

pub use metric::{Metric, UnknownMetric};
pub use reading::{coerce_f64, ReadingError, Record, RiskLevel, SensorReading};
