use thiserror::Error;

use crate::protocol::Metric;

/// Main error type for the soil monitor service
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),

    #[error("Calibration error: {0}")]
    Calibration(#[from] CalibrationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data source error: {0}")]
    DataSource(String),
}

/// Failure of a single sensor read. Never fatal to the poll loop.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    #[error("Sensor has not been started")]
    NotStarted,

    #[error("Timed out waiting for {0} reply")]
    Timeout(Metric),

    #[error("Device reported {metric} failure: {reason}")]
    Device { metric: Metric, reason: String },

    #[error("Unexpected reply to {metric} query: {line}")]
    UnexpectedReply { metric: Metric, line: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("No more recorded {0} values")]
    Exhausted(Metric),
}

/// Errors loading, validating or persisting calibration bounds
#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("Calibration file not found: {0}")]
    Missing(String),

    #[error("Invalid bounds: max_raw ({max_raw}) must be greater than min_raw ({min_raw})")]
    InvalidBounds { min_raw: u16, max_raw: u16 },

    #[error("No readings observed, nothing to calibrate from")]
    NoReadings,

    #[error("Calibration file IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed calibration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Cannot encode calibration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Cannot replace calibration file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_bounds_display() {
        let err = CalibrationError::InvalidBounds {
            min_raw: 500,
            max_raw: 400,
        };
        let msg = err.to_string();
        assert!(msg.contains("max_raw (400)"));
        assert!(msg.contains("min_raw (500)"));
    }

    #[test]
    fn test_no_readings_display() {
        let msg = CalibrationError::NoReadings.to_string();
        assert!(msg.contains("No readings"));
        assert!(!msg.contains("max_raw"));
    }

    #[test]
    fn test_sensor_error_display() {
        let err = SensorError::Device {
            metric: Metric::Moisture,
            reason: "i2c nack".to_string(),
        };
        assert_eq!(err.to_string(), "Device reported moisture failure: i2c nack");

        let err = SensorError::Timeout(Metric::Temperature);
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_monitor_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MonitorError = io_err.into();
        assert!(matches!(err, MonitorError::Io(_)));
    }

    #[test]
    fn test_monitor_error_from_sensor() {
        let err: MonitorError = SensorError::NotStarted.into();
        assert!(matches!(err, MonitorError::Sensor(SensorError::NotStarted)));
    }
}
