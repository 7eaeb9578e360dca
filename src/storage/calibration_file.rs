use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::CalibrationError;
use crate::processing::calibration::CalibrationBounds;
use crate::protocol::RawMoisture;

/// On-disk layout of the calibration file
#[derive(Debug, Serialize, Deserialize)]
struct CalibrationDocument {
    sensor: SensorSection,
}

#[derive(Debug, Serialize, Deserialize)]
struct SensorSection {
    #[serde(alias = "min_moisture")]
    min_raw: RawMoisture,
    #[serde(alias = "max_moisture")]
    max_raw: RawMoisture,
}

/// TOML file holding the persisted calibration bounds
#[derive(Debug, Clone)]
pub struct CalibrationStore {
    path: PathBuf,
}

impl CalibrationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted bounds, reporting why they are unusable
    pub fn try_load(&self) -> Result<CalibrationBounds, CalibrationError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CalibrationError::Missing(self.path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let document: CalibrationDocument = toml::from_str(&text)?;
        let SensorSection { min_raw, max_raw } = document.sensor;

        if max_raw < min_raw {
            return Err(CalibrationError::InvalidBounds { min_raw, max_raw });
        }

        Ok(CalibrationBounds::from_raw_parts(min_raw, max_raw))
    }

    /// Persisted bounds, or the defaults if there are none usable
    pub fn load(&self) -> CalibrationBounds {
        match self.try_load() {
            Ok(bounds) => {
                tracing::debug!(
                    "Calibration loaded from {}: {}..{}",
                    self.path.display(),
                    bounds.min_raw(),
                    bounds.max_raw()
                );
                if bounds.is_degenerate() {
                    tracing::warn!(
                        "Calibration in {} has no spread; readings stay unnormalized until it widens",
                        self.path.display()
                    );
                }
                bounds
            }
            Err(e) => {
                let defaults = CalibrationBounds::default();
                tracing::warn!(
                    "{}; using default bounds {}..{}",
                    e,
                    defaults.min_raw(),
                    defaults.max_raw()
                );
                defaults
            }
        }
    }

    /// Replace the file contents with `bounds`.
    ///
    /// Writes a sibling temporary file and renames it over the target, so a
    /// crash leaves either the old or the new bounds on disk.
    pub fn save(&self, bounds: &CalibrationBounds) -> Result<(), CalibrationError> {
        let document = CalibrationDocument {
            sensor: SensorSection {
                min_raw: bounds.min_raw(),
                max_raw: bounds.max_raw(),
            },
        };
        let text = toml::to_string(&document)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(text.as_bytes())?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path)?;

        tracing::info!(
            "New calibration saved: min_raw={}, max_raw={}",
            bounds.min_raw(),
            bounds.max_raw()
        );
        Ok(())
    }
}
