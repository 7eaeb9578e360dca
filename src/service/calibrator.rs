use tokio::sync::Mutex;

use crate::error::CalibrationError;
use crate::processing::calibration::{CalibrationBounds, observe_all};
use crate::protocol::RawMoisture;
use crate::storage::CalibrationStore;

/// Owner of the live calibration bounds and their backing file.
///
/// Every read-modify-write of the bounds, including the file write, happens
/// while holding the lock, so the poll loop and the calibration endpoints
/// cannot lose each other's updates.
#[derive(Debug)]
pub struct Calibrator {
    bounds: Mutex<CalibrationBounds>,
    store: CalibrationStore,
}

impl Calibrator {
    /// Start from whatever the store holds (defaults if nothing usable)
    pub fn load(store: CalibrationStore) -> Self {
        let bounds = store.load();
        tracing::info!(
            "Calibration bounds {}..{} ({})",
            bounds.min_raw(),
            bounds.max_raw(),
            store.path().display()
        );
        Self::with_bounds(store, bounds)
    }

    pub fn with_bounds(store: CalibrationStore, bounds: CalibrationBounds) -> Self {
        Self {
            bounds: Mutex::new(bounds),
            store,
        }
    }

    pub async fn current(&self) -> CalibrationBounds {
        *self.bounds.lock().await
    }

    /// Widen the bounds by a batch of raw samples and persist them if they changed.
    ///
    /// A failed save is logged; the widened bounds stay in effect in memory.
    pub async fn observe(&self, samples: &[RawMoisture]) -> CalibrationBounds {
        let mut bounds = self.bounds.lock().await;

        let (widened, changed) = observe_all(samples.iter().copied(), *bounds);
        if !changed {
            return widened;
        }

        tracing::info!(
            "Calibration widened from {}..{} to {}..{}",
            bounds.min_raw(),
            bounds.max_raw(),
            widened.min_raw(),
            widened.max_raw()
        );
        *bounds = widened;

        if let Err(e) = self.persist(widened).await {
            tracing::error!(
                "Failed to persist calibration to {}: {}",
                self.store.path().display(),
                e
            );
        }

        widened
    }

    /// Install new bounds. Nothing changes unless they were persisted.
    pub async fn replace(
        &self,
        new_bounds: CalibrationBounds,
    ) -> Result<CalibrationBounds, CalibrationError> {
        let mut bounds = self.bounds.lock().await;

        self.persist(new_bounds).await?;
        *bounds = new_bounds;

        Ok(new_bounds)
    }

    /// Write `bounds` to the store off the async workers.
    ///
    /// Callers hold the bounds lock across this so file writes stay ordered.
    async fn persist(&self, bounds: CalibrationBounds) -> Result<(), CalibrationError> {
        let store = self.store.clone();

        tokio::task::spawn_blocking(move || store.save(&bounds))
            .await
            .map_err(|e| CalibrationError::Io(std::io::Error::other(e)))?
    }

    pub async fn reset(&self) -> Result<CalibrationBounds, CalibrationError> {
        tracing::info!("Resetting calibration to defaults");
        self.replace(CalibrationBounds::default()).await
    }
}
