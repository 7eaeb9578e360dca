use std::path::PathBuf;
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

use super::SoilSensor;
use crate::error::{MonitorError, SensorError};
use crate::protocol::{Metric, RawMoisture, parse_line};

// ISO8601 timestamp at start of line, with optional fraction and timezone
static TIMESTAMPED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:\d{2})?)\s+(.*)$")
        .unwrap()
});

/// A line from the log file with its timestamp
#[derive(Debug, Clone)]
struct TimestampedLine {
    timestamp: Option<DateTime<Utc>>,
    content: String,
}

/// Per-metric outcomes of a recorded bridge session
#[derive(Debug, Default)]
struct Recording {
    moisture: Vec<Result<RawMoisture, SensorError>>,
    temperature: Vec<Result<f64, SensorError>>,
    first: Option<DateTime<Utc>>,
    last: Option<DateTime<Utc>>,
}

impl Recording {
    fn parse(log: &str) -> Self {
        let mut recording = Recording::default();

        for raw_line in log.lines() {
            let Some(line) = parse_timestamped_line(raw_line) else {
                continue;
            };

            let parsed = parse_line(&line.content);
            match parsed.metric() {
                Some(Metric::Moisture) => recording.moisture.push(parsed.into_moisture()),
                Some(Metric::Temperature) => recording.temperature.push(parsed.into_temperature()),
                None => continue,
            }

            if let Some(ts) = line.timestamp {
                recording.first.get_or_insert(ts);
                recording.last = Some(ts);
            }
        }

        recording
    }
}

/// Parse a log line, "2025-06-01T07:30:00.123 MOISTURE=612".
///
/// The timestamp is optional so hand-written logs can be plain bridge output.
fn parse_timestamped_line(line: &str) -> Option<TimestampedLine> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let Some(caps) = TIMESTAMPED_LINE.captures(trimmed) else {
        return Some(TimestampedLine {
            timestamp: None,
            content: trimmed.to_string(),
        });
    };

    let timestamp_str = caps.get(1)?.as_str();
    let content = caps.get(2)?.as_str();

    let timestamp = DateTime::parse_from_rfc3339(timestamp_str)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(timestamp_str, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|ndt| ndt.and_utc())
        })
        .ok();

    Some(TimestampedLine {
        timestamp,
        content: content.to_string(),
    })
}

/// Take the next recorded outcome, wrapping around when looping
fn next_outcome<T: Clone>(
    outcomes: &[Result<T, SensorError>],
    position: &mut usize,
    loop_playback: bool,
    metric: Metric,
) -> Result<T, SensorError> {
    if *position >= outcomes.len() {
        if !loop_playback || outcomes.is_empty() {
            return Err(SensorError::Exhausted(metric));
        }
        tracing::info!("Looping {} playback from start", metric);
        *position = 0;
    }

    let outcome = outcomes[*position].clone();
    *position += 1;
    outcome
}

/// Sensor replaying a recorded bridge log
pub struct PlaybackSensor {
    log_file: PathBuf,
    loop_playback: bool,
    recording: Option<Recording>,
    moisture_position: usize,
    temperature_position: usize,
}

impl PlaybackSensor {
    pub fn new(log_file: PathBuf, loop_playback: bool) -> Self {
        Self {
            log_file,
            loop_playback,
            recording: None,
            moisture_position: 0,
            temperature_position: 0,
        }
    }
}

#[async_trait]
impl SoilSensor for PlaybackSensor {
    async fn start(&mut self) -> Result<(), MonitorError> {
        let log = tokio::fs::read_to_string(&self.log_file).await?;
        let recording = Recording::parse(&log);

        if recording.moisture.is_empty() && recording.temperature.is_empty() {
            return Err(MonitorError::DataSource(format!(
                "No sensor readings found in {:?}",
                self.log_file
            )));
        }

        tracing::info!(
            "Playback of {:?}: {} moisture and {} temperature values recorded {:?} to {:?}",
            self.log_file,
            recording.moisture.len(),
            recording.temperature.len(),
            recording.first,
            recording.last
        );

        self.recording = Some(recording);
        self.moisture_position = 0;
        self.temperature_position = 0;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), MonitorError> {
        self.recording = None;
        tracing::info!("Playback sensor stopped");
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.recording.is_some()
    }

    async fn read_moisture(&mut self) -> Result<RawMoisture, SensorError> {
        let recording = self.recording.as_ref().ok_or(SensorError::NotStarted)?;
        next_outcome(
            &recording.moisture,
            &mut self.moisture_position,
            self.loop_playback,
            Metric::Moisture,
        )
    }

    async fn read_temperature(&mut self) -> Result<f64, SensorError> {
        let recording = self.recording.as_ref().ok_or(SensorError::NotStarted)?;
        next_outcome(
            &recording.temperature,
            &mut self.temperature_position,
            self.loop_playback,
            Metric::Temperature,
        )
    }

    fn name(&self) -> &str {
        self.log_file.to_str().unwrap_or("playback")
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::Timelike;
    use tempfile::NamedTempFile;

    use super::*;

    const LOG: &str = "\
# garden bed 2
2025-06-01T07:30:00.000 READY
2025-06-01T07:30:00.100 MOISTURE=612
2025-06-01T07:30:00.200 TEMP=18.5
2025-06-01T07:30:00.300 ERR MOISTURE i2c nack
2025-06-01T07:30:00.400 TEMP=18.75
2025-06-01T07:30:05Z MOISTURE=615
";

    fn log_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_timestamped_line_with_millis() {
        let parsed = parse_timestamped_line("2025-06-01T07:30:00.123 MOISTURE=612").unwrap();
        assert_eq!(parsed.content, "MOISTURE=612");
        let ts = parsed.timestamp.unwrap();
        assert_eq!(ts.hour(), 7);
        assert_eq!(ts.minute(), 30);
    }

    #[test]
    fn test_parse_line_with_timezone() {
        let parsed = parse_timestamped_line("2025-06-01T07:30:00+02:00 TEMP=20.0").unwrap();
        assert_eq!(parsed.content, "TEMP=20.0");
        assert_eq!(parsed.timestamp.unwrap().hour(), 5);
    }

    #[test]
    fn test_parse_line_without_timestamp() {
        let parsed = parse_timestamped_line("MOISTURE=700").unwrap();
        assert!(parsed.timestamp.is_none());
        assert_eq!(parsed.content, "MOISTURE=700");

        assert!(parse_timestamped_line("   ").is_none());
        assert!(parse_timestamped_line("# comment").is_none());
    }

    #[test]
    fn test_recording_splits_metrics() {
        let recording = Recording::parse(LOG);

        assert_eq!(recording.moisture.len(), 3);
        assert_eq!(recording.moisture[0], Ok(612));
        assert!(recording.moisture[1].is_err());
        assert_eq!(recording.moisture[2], Ok(615));
        assert_eq!(recording.temperature, vec![Ok(18.5), Ok(18.75)]);
        assert_eq!(recording.first.unwrap().second(), 0);
        assert_eq!(recording.last.unwrap().second(), 5);
    }

    #[tokio::test]
    async fn test_playback_replays_in_order() {
        let file = log_file(LOG);
        let mut sensor = PlaybackSensor::new(file.path().to_path_buf(), false);

        assert_eq!(sensor.read_moisture().await, Err(SensorError::NotStarted));

        sensor.start().await.unwrap();
        assert!(sensor.is_active());

        assert_eq!(sensor.read_moisture().await, Ok(612));
        assert!(matches!(
            sensor.read_moisture().await,
            Err(SensorError::Device { .. })
        ));
        assert_eq!(sensor.read_temperature().await, Ok(18.5));
        assert_eq!(sensor.read_moisture().await, Ok(615));
        assert_eq!(
            sensor.read_moisture().await,
            Err(SensorError::Exhausted(Metric::Moisture))
        );
        // Temperature position is independent of moisture
        assert_eq!(sensor.read_temperature().await, Ok(18.75));

        sensor.stop().await.unwrap();
        assert!(!sensor.is_active());
    }

    #[tokio::test]
    async fn test_playback_loops() {
        let file = log_file("MOISTURE=400\nMOISTURE=410\n");
        let mut sensor = PlaybackSensor::new(file.path().to_path_buf(), true);
        sensor.start().await.unwrap();

        let values: Vec<_> = [
            sensor.read_moisture().await,
            sensor.read_moisture().await,
            sensor.read_moisture().await,
        ]
        .into_iter()
        .collect();
        assert_eq!(values, vec![Ok(400), Ok(410), Ok(400)]);

        // Nothing recorded for temperature, even when looping
        assert_eq!(
            sensor.read_temperature().await,
            Err(SensorError::Exhausted(Metric::Temperature))
        );
    }

    #[tokio::test]
    async fn test_playback_rejects_empty_log() {
        let file = log_file("READY\nhello\n");
        let mut sensor = PlaybackSensor::new(file.path().to_path_buf(), false);

        let result = sensor.start().await;
        assert!(matches!(result, Err(MonitorError::DataSource(_))));
    }

    #[tokio::test]
    async fn test_playback_missing_file() {
        let mut sensor = PlaybackSensor::new(PathBuf::from("/nonexistent/garden.log"), false);
        assert!(matches!(sensor.start().await, Err(MonitorError::Io(_))));
    }
}
