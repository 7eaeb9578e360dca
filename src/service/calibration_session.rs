use std::future::Future;
use std::time::Duration;

use crate::error::CalibrationError;
use crate::processing::calibration::{CalibrationBounds, ObservedRange};
use crate::protocol::RawMoisture;
use crate::sensor::SoilSensor;
use crate::storage::CalibrationStore;

/// Interactive calibration: watch the raw range while the probe is moved
/// between dry air and water
#[derive(Debug)]
pub struct CalibrationSession {
    range: ObservedRange,
    readings: u64,
}

impl CalibrationSession {
    pub fn new() -> Self {
        Self {
            range: ObservedRange::new(),
            readings: 0,
        }
    }

    pub fn range(&self) -> &ObservedRange {
        &self.range
    }

    pub fn readings(&self) -> u64 {
        self.readings
    }

    /// Take one moisture reading into the range
    pub async fn step(&mut self, sensor: &mut dyn SoilSensor) -> Option<RawMoisture> {
        match sensor.read_moisture().await {
            Ok(raw) => {
                self.range.observe(raw);
                self.readings += 1;
                tracing::info!(
                    "Current value: {} | min: {} | max: {}",
                    raw,
                    fmt_bound(self.range.min()),
                    fmt_bound(self.range.max())
                );
                Some(raw)
            }
            Err(e) => {
                tracing::warn!("Moisture read failed: {}", e);
                None
            }
        }
    }

    /// Report the final range and save it to `store` when given.
    ///
    /// Returns the saved bounds; a range without spread is never saved.
    pub fn finish(
        &self,
        store: Option<&CalibrationStore>,
    ) -> Result<Option<CalibrationBounds>, CalibrationError> {
        match self.range().bounds() {
            Some(observed) => tracing::info!(
                "Calibration finished after {} readings: min={} max={}",
                self.readings(),
                observed.min_raw(),
                observed.max_raw()
            ),
            None => tracing::warn!("Calibration finished without a single reading"),
        }

        let Some(store) = store else {
            return Ok(None);
        };

        match self.range().to_calibration() {
            Ok(bounds) => {
                store.save(&bounds)?;
                tracing::info!(
                    "Saved calibration {}..{} to {}",
                    bounds.min_raw(),
                    bounds.max_raw(),
                    store.path().display()
                );
                Ok(Some(bounds))
            }
            Err(e) => {
                tracing::warn!("{}; calibration not saved", e);
                Ok(None)
            }
        }
    }
}

fn fmt_bound(value: Option<RawMoisture>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Poll every `interval` until `shutdown` resolves, then finish the session
pub async fn run_calibration_session(
    sensor: &mut dyn SoilSensor,
    interval: Duration,
    store: Option<&CalibrationStore>,
    shutdown: impl Future<Output = ()>,
) -> Result<Option<CalibrationBounds>, CalibrationError> {
    tracing::info!("Starting calibration readings. Press Ctrl+C to finish.");

    let mut session = CalibrationSession::new();
    tokio::pin!(shutdown);

    loop {
        session.step(sensor).await;

        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    session.finish(store)
}
