use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use crate::error::MonitorError;
use crate::processing::calibration::normalize_mean;
use crate::processing::outlier::OutlierFilter;
use crate::processing::sampler::{SamplerSettings, sample_batch};
use crate::protocol::Reading;
use crate::sensor::SoilSensor;
use crate::service::calibrator::Calibrator;
use crate::service::sink::ReadingSink;
use crate::service::state::SharedState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSettings {
    /// Pause between the end of one cycle and the start of the next
    pub interval: Duration,
    pub sampler: SamplerSettings,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            sampler: SamplerSettings::default(),
        }
    }
}

/// Background poll loop: sample, calibrate, normalize, hand off to sinks
pub struct PollLoop {
    state: SharedState,
    calibrator: Arc<Calibrator>,
    outlier_filter: Arc<dyn OutlierFilter>,
    sinks: Vec<Arc<dyn ReadingSink>>,
    settings: PollSettings,
}

impl PollLoop {
    pub fn new(
        state: SharedState,
        calibrator: Arc<Calibrator>,
        outlier_filter: Box<dyn OutlierFilter>,
        settings: PollSettings,
    ) -> Self {
        Self {
            state,
            calibrator,
            outlier_filter: Arc::from(outlier_filter),
            sinks: Vec::new(),
            settings,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ReadingSink>) -> Self {
        tracing::debug!("Adding {} sink", sink.name());
        self.sinks.push(sink);
        self
    }

    /// Poll until `shutdown` flips (or its sender goes away), then stop the sensor
    pub async fn run(
        &self,
        mut sensor: Box<dyn SoilSensor>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), MonitorError> {
        tracing::info!(
            "Poll loop started on {}: {} samples per reading, every {:?}, {} outlier filter",
            sensor.name(),
            self.settings.sampler.count,
            self.settings.interval,
            self.outlier_filter.name()
        );

        while !*shutdown.borrow() {
            self.poll_once(sensor.as_mut()).await;

            tokio::select! {
                _ = tokio::time::sleep(self.settings.interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        if sensor.is_active() {
            sensor.stop().await?;
        }
        tracing::info!("Poll loop finished");
        Ok(())
    }

    /// One poll cycle
    pub async fn poll_once(&self, sensor: &mut dyn SoilSensor) -> Reading {
        let batch = sample_batch(sensor, &self.settings.sampler)
            .await
            .filtered(self.outlier_filter.as_ref());

        // Widen first so the percent matches the bounds the reading reports
        let bounds = self.calibrator.observe(&batch.moisture).await;

        let moisture_raw = batch.mean_moisture();
        let moisture_percent = normalize_mean(moisture_raw, &bounds);
        let temperature = batch.mean_temperature();

        let reading = Reading::new(
            Utc::now(),
            moisture_raw,
            moisture_percent,
            temperature,
            bounds,
        )
        .with_sample_counts(batch.moisture.len(), batch.temperature.len());

        tracing::debug!(
            "Sensor read: moisture={:?} ({:?}%), temp={:?}C, bounds={}..{}",
            moisture_raw,
            moisture_percent,
            temperature,
            bounds.min_raw(),
            bounds.max_raw()
        );

        self.state.write().await.record(reading.clone());

        for sink in &self.sinks {
            if let Err(e) = sink.accept(&reading).await {
                tracing::error!("Failed to deliver reading to {} sink: {}", sink.name(), e);
            }
        }

        reading
    }
}
