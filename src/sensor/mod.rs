pub mod playback;
pub mod serial;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{MonitorError, SensorError};
use crate::protocol::RawMoisture;

/// Capability to take single readings from a soil sensor (real bridge or recording)
#[async_trait]
pub trait SoilSensor: Send + Sync {
    /// Open the underlying transport
    async fn start(&mut self) -> Result<(), MonitorError>;

    /// Release the underlying transport
    async fn stop(&mut self) -> Result<(), MonitorError>;

    fn is_active(&self) -> bool;

    /// One raw capacitive moisture reading
    async fn read_moisture(&mut self) -> Result<RawMoisture, SensorError>;

    /// One temperature reading in degrees Celsius
    async fn read_temperature(&mut self) -> Result<f64, SensorError>;

    /// Name of this sensor for logging
    fn name(&self) -> &str;
}

/// Configuration for creating sensors
#[derive(Debug, Clone)]
pub enum SensorConfig {
    /// Sensor bridge on a serial port
    Serial {
        port: String,
        baud_rate: u32,
        reply_timeout: Duration,
    },
    /// Replay of a recorded bridge log
    Playback {
        log_file: PathBuf,
        loop_playback: bool,
    },
}

impl SensorConfig {
    pub fn create_sensor(&self) -> Box<dyn SoilSensor> {
        match self {
            SensorConfig::Serial {
                port,
                baud_rate,
                reply_timeout,
            } => Box::new(serial::SerialSensor::new(
                port.clone(),
                *baud_rate,
                *reply_timeout,
            )),
            SensorConfig::Playback {
                log_file,
                loop_playback,
            } => Box::new(playback::PlaybackSensor::new(
                log_file.clone(),
                *loop_playback,
            )),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_serial_sensor() {
        let config = SensorConfig::Serial {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 115200,
            reply_timeout: Duration::from_secs(1),
        };
        let sensor = config.create_sensor();
        assert_eq!(sensor.name(), "/dev/ttyACM0");
        assert!(!sensor.is_active());
    }

    #[test]
    fn test_create_playback_sensor() {
        let config = SensorConfig::Playback {
            log_file: PathBuf::from("garden.log"),
            loop_playback: true,
        };
        let sensor = config.create_sensor();
        assert_eq!(sensor.name(), "garden.log");
        assert!(!sensor.is_active());
    }
}
