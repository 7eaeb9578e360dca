use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::processing::calibration::CalibrationBounds;

/// Raw capacitive moisture value as reported by the sensor
pub type RawMoisture = u16;

/// The two quantities the soil sensor reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Moisture,
    Temperature,
}

impl Metric {
    /// Query line sent to the bridge
    pub fn query(&self) -> &'static str {
        match self {
            Metric::Moisture => "MOISTURE?",
            Metric::Temperature => "TEMP?",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "MOISTURE" => Some(Metric::Moisture),
            "TEMP" => Some(Metric::Temperature),
            _ => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Moisture => f.write_str("moisture"),
            Metric::Temperature => f.write_str("temperature"),
        }
    }
}

/// One poll cycle's result, normalized against the bounds it carries.
///
/// This is also the shape of a history row and of the live update message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    /// Mean of the successful raw samples
    pub moisture_raw: Option<f64>,
    pub moisture_percent: Option<u8>,
    /// Mean temperature in degrees Celsius
    pub temperature: Option<f64>,
    pub min_raw: RawMoisture,
    pub max_raw: RawMoisture,
    pub moisture_samples: u32,
    pub temperature_samples: u32,
}

impl Reading {
    pub fn new(
        timestamp: DateTime<Utc>,
        moisture_raw: Option<f64>,
        moisture_percent: Option<u8>,
        temperature: Option<f64>,
        bounds: CalibrationBounds,
    ) -> Self {
        Self {
            timestamp,
            moisture_raw,
            moisture_percent,
            temperature,
            min_raw: bounds.min_raw(),
            max_raw: bounds.max_raw(),
            moisture_samples: 0,
            temperature_samples: 0,
        }
    }

    pub fn with_sample_counts(mut self, moisture: usize, temperature: usize) -> Self {
        self.moisture_samples = u32::try_from(moisture).unwrap_or(u32::MAX);
        self.temperature_samples = u32::try_from(temperature).unwrap_or(u32::MAX);
        self
    }

    #[cfg(test)]
    pub fn bounds(&self) -> CalibrationBounds {
        CalibrationBounds::from_raw_parts(self.min_raw, self.max_raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_tags() {
        assert_eq!(Metric::from_tag("MOISTURE"), Some(Metric::Moisture));
        assert_eq!(Metric::from_tag("TEMP"), Some(Metric::Temperature));
        assert_eq!(Metric::from_tag("HUMIDITY"), None);
        assert_eq!(Metric::Moisture.query(), "MOISTURE?");
        assert_eq!(Metric::Temperature.to_string(), "temperature");
    }

    #[test]
    fn test_reading_carries_bounds() {
        let bounds = CalibrationBounds::new(150, 900).unwrap();
        let reading = Reading::new(Utc::now(), Some(500.0), Some(46), Some(21.5), bounds)
            .with_sample_counts(7, 8);

        assert_eq!(reading.min_raw, 150);
        assert_eq!(reading.max_raw, 900);
        assert_eq!(reading.bounds(), bounds);
        assert_eq!(reading.moisture_samples, 7);
        assert_eq!(reading.temperature_samples, 8);
    }

    #[test]
    fn test_reading_serializes_absent_fields_as_null() {
        let reading = Reading::new(Utc::now(), None, None, Some(20.0), CalibrationBounds::default());
        let json = serde_json::to_value(&reading).unwrap();

        assert!(json["moisture_raw"].is_null());
        assert!(json["moisture_percent"].is_null());
        assert_eq!(json["temperature"], 20.0);
        assert_eq!(json["min_raw"], 200);
    }
}
