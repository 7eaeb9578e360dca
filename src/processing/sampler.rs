use std::time::Duration;

use crate::processing::outlier::OutlierFilter;
use crate::protocol::RawMoisture;
use crate::sensor::SoilSensor;

/// How many readings make up one batch and how far apart they are taken
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerSettings {
    pub count: usize,
    pub delay: Duration,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            count: 10,
            delay: Duration::from_millis(100),
        }
    }
}

/// Successful samples of one batch, per metric
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSample {
    pub moisture: Vec<RawMoisture>,
    pub temperature: Vec<f64>,
    pub moisture_failures: usize,
    pub temperature_failures: usize,
}

impl BatchSample {
    pub fn mean_moisture(&self) -> Option<f64> {
        let values: Vec<f64> = self.moisture.iter().map(|&v| f64::from(v)).collect();
        mean(&values)
    }

    pub fn mean_temperature(&self) -> Option<f64> {
        mean(&self.temperature)
    }

    /// Drop the samples `filter` flags as outliers
    pub fn filtered(self, filter: &dyn OutlierFilter) -> Self {
        let moisture_values: Vec<f64> = self.moisture.iter().map(|&v| f64::from(v)).collect();
        let mut rejected = filter.outliers(&moisture_values);
        rejected.sort_unstable();

        let moisture = self
            .moisture
            .into_iter()
            .enumerate()
            .filter(|(i, _)| rejected.binary_search(i).is_err())
            .map(|(_, v)| v)
            .collect();

        Self {
            moisture,
            temperature: filter.retain(&self.temperature),
            ..self
        }
    }
}

/// Arithmetic mean, absent for no values
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Take `settings.count` readings of each metric.
///
/// Failed reads are logged and dropped without retry, so the effective sample
/// count of a metric shrinks with every failure. Moisture and temperature fail
/// independently.
pub async fn sample_batch(sensor: &mut dyn SoilSensor, settings: &SamplerSettings) -> BatchSample {
    let mut batch = BatchSample::default();

    for attempt in 0..settings.count {
        match sensor.read_moisture().await {
            Ok(raw) => batch.moisture.push(raw),
            Err(e) => {
                tracing::warn!("Moisture read failed: {}", e);
                batch.moisture_failures += 1;
            }
        }

        match sensor.read_temperature().await {
            Ok(celsius) => batch.temperature.push(celsius),
            Err(e) => {
                tracing::warn!("Temperature read failed: {}", e);
                batch.temperature_failures += 1;
            }
        }

        if attempt + 1 < settings.count && !settings.delay.is_zero() {
            tokio::time::sleep(settings.delay).await;
        }
    }

    if settings.count > 0 && batch.moisture.is_empty() {
        tracing::error!("All {} moisture reads of the batch failed", batch.moisture_failures);
    }
    if settings.count > 0 && batch.temperature.is_empty() {
        tracing::error!(
            "All {} temperature reads of the batch failed",
            batch.temperature_failures
        );
    }

    batch
}
