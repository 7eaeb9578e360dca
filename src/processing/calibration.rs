use serde::Serialize;

use crate::error::CalibrationError;
use crate::protocol::RawMoisture;

/// Lower bound used when no calibration has been persisted yet
pub const DEFAULT_MIN_RAW: RawMoisture = 200;

/// Upper bound used when no calibration has been persisted yet
pub const DEFAULT_MAX_RAW: RawMoisture = 800;

/// Raw-unit range mapped linearly onto 0-100 %.
///
/// `min_raw <= max_raw` always holds. Equal bounds are representable (a
/// calibration session that saw a single value) but cannot be normalized
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalibrationBounds {
    min_raw: RawMoisture,
    max_raw: RawMoisture,
}

impl CalibrationBounds {
    /// Bounds from user input. Requires a non-empty spread.
    pub fn new(min_raw: RawMoisture, max_raw: RawMoisture) -> Result<Self, CalibrationError> {
        if max_raw <= min_raw {
            return Err(CalibrationError::InvalidBounds { min_raw, max_raw });
        }
        Ok(Self { min_raw, max_raw })
    }

    /// Bounds from already stored values, ordering them if needed
    pub(crate) fn from_raw_parts(a: RawMoisture, b: RawMoisture) -> Self {
        Self {
            min_raw: a.min(b),
            max_raw: a.max(b),
        }
    }

    pub fn min_raw(&self) -> RawMoisture {
        self.min_raw
    }

    pub fn max_raw(&self) -> RawMoisture {
        self.max_raw
    }

    /// True when there is no spread to divide by
    pub fn is_degenerate(&self) -> bool {
        self.max_raw == self.min_raw
    }
}

impl Default for CalibrationBounds {
    fn default() -> Self {
        Self {
            min_raw: DEFAULT_MIN_RAW,
            max_raw: DEFAULT_MAX_RAW,
        }
    }
}

/// Map a raw reading to a 0-100 percentage.
///
/// `trunc((raw - min) / (max - min) * 100)` clamped to `[0, 100]`.
/// Absent input and degenerate bounds give absent output.
pub fn normalize(raw: Option<RawMoisture>, bounds: &CalibrationBounds) -> Option<u8> {
    normalize_mean(raw.map(f64::from), bounds)
}

/// Same transform as [`normalize`] for a (possibly fractional) batch mean
pub fn normalize_mean(raw: Option<f64>, bounds: &CalibrationBounds) -> Option<u8> {
    let raw = raw?;

    if bounds.is_degenerate() {
        tracing::error!(
            "Cannot normalize {}: calibration bounds have no spread ({}..{})",
            raw,
            bounds.min_raw,
            bounds.max_raw
        );
        return None;
    }

    let min = f64::from(bounds.min_raw);
    let max = f64::from(bounds.max_raw);
    let percent = ((raw - min) / (max - min) * 100.0).trunc();

    Some(percent.clamp(0.0, 100.0) as u8)
}

/// Widen `bounds` to include `raw`. Returns the new bounds and whether they changed.
pub fn observe_and_update(
    raw: RawMoisture,
    bounds: CalibrationBounds,
) -> (CalibrationBounds, bool) {
    let mut updated = bounds;

    if raw < updated.min_raw {
        updated.min_raw = raw;
    }
    if raw > updated.max_raw {
        updated.max_raw = raw;
    }

    (updated, updated != bounds)
}

/// Widen `bounds` by every sample of a batch
pub fn observe_all<I>(samples: I, bounds: CalibrationBounds) -> (CalibrationBounds, bool)
where
    I: IntoIterator<Item = RawMoisture>,
{
    samples
        .into_iter()
        .fold((bounds, false), |(bounds, changed), raw| {
            let (bounds, widened) = observe_and_update(raw, bounds);
            (bounds, changed || widened)
        })
}

/// Range tracker for a fresh calibration run; starts empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObservedRange {
    min: Option<RawMoisture>,
    max: Option<RawMoisture>,
}

impl ObservedRange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value. Returns true if it extended the range.
    pub fn observe(&mut self, raw: RawMoisture) -> bool {
        let mut extended = false;

        if self.min.is_none_or(|min| raw < min) {
            self.min = Some(raw);
            extended = true;
        }
        if self.max.is_none_or(|max| raw > max) {
            self.max = Some(raw);
            extended = true;
        }

        extended
    }

    pub fn min(&self) -> Option<RawMoisture> {
        self.min
    }

    pub fn max(&self) -> Option<RawMoisture> {
        self.max
    }

    /// Observed range as bounds, possibly degenerate
    pub fn bounds(&self) -> Option<CalibrationBounds> {
        Some(CalibrationBounds::from_raw_parts(self.min?, self.max?))
    }

    /// Observed range as usable calibration; requires a spread
    pub fn to_calibration(&self) -> Result<CalibrationBounds, CalibrationError> {
        match (self.min, self.max) {
            (Some(min_raw), Some(max_raw)) => CalibrationBounds::new(min_raw, max_raw),
            _ => Err(CalibrationError::NoReadings),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(min: RawMoisture, max: RawMoisture) -> CalibrationBounds {
        CalibrationBounds::new(min, max).unwrap()
    }

    #[test]
    fn test_default_bounds() {
        let b = CalibrationBounds::default();
        assert_eq!(b.min_raw(), 200);
        assert_eq!(b.max_raw(), 800);
        assert!(!b.is_degenerate());
    }

    #[test]
    fn test_new_rejects_empty_or_inverted_spread() {
        assert!(CalibrationBounds::new(500, 500).is_err());
        assert!(CalibrationBounds::new(600, 500).is_err());
        assert!(CalibrationBounds::new(499, 500).is_ok());
    }

    #[test]
    fn test_from_raw_parts_orders_values() {
        let b = CalibrationBounds::from_raw_parts(900, 100);
        assert_eq!(b.min_raw(), 100);
        assert_eq!(b.max_raw(), 900);
    }

    #[test]
    fn test_normalize_reference_points() {
        let b = bounds(200, 800);
        assert_eq!(normalize(Some(500), &b), Some(50));
        assert_eq!(normalize(Some(200), &b), Some(0));
        assert_eq!(normalize(Some(800), &b), Some(100));
    }

    #[test]
    fn test_normalize_truncates() {
        let b = bounds(100, 800);
        // 400 / 700 * 100 = 57.14
        assert_eq!(normalize(Some(500), &b), Some(57));
        // 699 / 700 * 100 = 99.857 truncates, not rounds
        assert_eq!(normalize(Some(799), &b), Some(99));
    }

    #[test]
    fn test_normalize_clamps_outside_range() {
        let b = bounds(200, 800);
        assert_eq!(normalize(Some(100), &b), Some(0));
        assert_eq!(normalize(Some(0), &b), Some(0));
        assert_eq!(normalize(Some(801), &b), Some(100));
        assert_eq!(normalize(Some(RawMoisture::MAX), &b), Some(100));
    }

    #[test]
    fn test_normalize_stays_in_percent_range() {
        let b = bounds(317, 1015);
        for raw in 0..=2000 {
            let percent = normalize(Some(raw), &b).unwrap();
            assert!(percent <= 100);
            if raw <= b.min_raw() {
                assert_eq!(percent, 0);
            }
            if raw >= b.max_raw() {
                assert_eq!(percent, 100);
            }
        }
    }

    #[test]
    fn test_normalize_absent() {
        assert_eq!(normalize(None, &bounds(200, 800)), None);
        assert_eq!(normalize_mean(None, &bounds(200, 800)), None);
    }

    #[test]
    fn test_normalize_degenerate_bounds_is_absent() {
        let b = CalibrationBounds::from_raw_parts(400, 400);
        assert!(b.is_degenerate());
        assert_eq!(normalize(Some(400), &b), None);
        assert_eq!(normalize_mean(Some(399.5), &b), None);
    }

    #[test]
    fn test_normalize_mean_fractional() {
        let b = bounds(200, 800);
        // 303.5 / 600 * 100 = 50.58
        assert_eq!(normalize_mean(Some(503.5), &b), Some(50));
    }

    #[test]
    fn test_observe_widens_min() {
        let (b, changed) = observe_and_update(100, bounds(200, 800));
        assert!(changed);
        assert_eq!(b, bounds(100, 800));
        assert_eq!(normalize(Some(100), &b), Some(0));
        assert_eq!(normalize(Some(500), &b), Some(57));
    }

    #[test]
    fn test_observe_widens_max() {
        let (b, changed) = observe_and_update(950, bounds(200, 800));
        assert!(changed);
        assert_eq!(b, bounds(200, 950));
    }

    #[test]
    fn test_observe_inside_range_is_unchanged() {
        let initial = bounds(200, 800);
        for raw in [200, 201, 500, 799, 800] {
            let (b, changed) = observe_and_update(raw, initial);
            assert!(!changed);
            assert_eq!(b, initial);
        }
    }

    #[test]
    fn test_observe_is_idempotent() {
        let (once, first) = observe_and_update(1200, bounds(200, 800));
        let (twice, second) = observe_and_update(1200, once);
        assert!(first);
        assert!(!second);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_observe_is_monotonic() {
        let initial = bounds(400, 600);
        let mut current = initial;
        let mut last = initial;

        for raw in [500, 350, 650, 420, 100, 580, 1000, 999, 50] {
            (current, _) = observe_and_update(raw, current);
            assert!(current.min_raw() <= last.min_raw());
            assert!(current.max_raw() >= last.max_raw());
            assert!(current.min_raw() <= initial.min_raw());
            assert!(current.max_raw() >= initial.max_raw());
            last = current;
        }

        assert_eq!(current, bounds(50, 1000));
    }

    #[test]
    fn test_observe_all() {
        let (b, changed) = observe_all([300, 150, 700, 900], bounds(200, 800));
        assert!(changed);
        assert_eq!(b, bounds(150, 900));

        let (b, changed) = observe_all([300, 400], bounds(200, 800));
        assert!(!changed);
        assert_eq!(b, bounds(200, 800));

        let (_, changed) = observe_all(Vec::new(), bounds(200, 800));
        assert!(!changed);
    }

    #[test]
    fn test_observed_range_starts_empty() {
        let range = ObservedRange::new();
        assert_eq!(range.min(), None);
        assert_eq!(range.bounds(), None);
        assert!(matches!(
            range.to_calibration(),
            Err(CalibrationError::NoReadings)
        ));
    }

    #[test]
    fn test_observed_range_tracks_extremes() {
        let mut range = ObservedRange::new();

        assert!(range.observe(500));
        assert_eq!(range.bounds(), Some(CalibrationBounds::from_raw_parts(500, 500)));
        assert!(range.to_calibration().is_err());

        assert!(range.observe(320));
        assert!(!range.observe(400));
        assert!(range.observe(1010));

        assert_eq!(range.min(), Some(320));
        assert_eq!(range.max(), Some(1010));
        assert_eq!(range.to_calibration().unwrap(), bounds(320, 1010));
    }
}
