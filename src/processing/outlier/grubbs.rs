use statrs::distribution::{ContinuousCDF, StudentsT};

use super::OutlierFilter;

/// Fewest samples the test is defined for
const MIN_SAMPLES: usize = 3;

/// Iterative two-sided Grubbs' test.
///
/// Each round rejects the single sample farthest from the mean if its
/// studentized deviation exceeds the critical value for the remaining sample
/// count, and stops at the first round that rejects nothing.
pub struct GrubbsFilter {
    alpha: f64,
}

impl GrubbsFilter {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(1e-6, 0.5),
        }
    }

    fn critical_value(&self, n: usize) -> Option<f64> {
        if n < MIN_SAMPLES {
            return None;
        }

        let n = n as f64;
        let t = StudentsT::new(0.0, 1.0, n - 2.0)
            .ok()?
            .inverse_cdf(1.0 - self.alpha / (2.0 * n));
        let t_sq = t * t;

        Some((n - 1.0) / n.sqrt() * (t_sq / (n - 2.0 + t_sq)).sqrt())
    }
}

/// Position and studentized deviation of the sample farthest from the mean
fn most_extreme(candidates: &[(usize, f64)]) -> Option<(usize, f64)> {
    let n = candidates.len() as f64;
    let mean = candidates.iter().map(|(_, v)| v).sum::<f64>() / n;
    let variance = candidates
        .iter()
        .map(|(_, v)| (v - mean).powi(2))
        .sum::<f64>()
        / (n - 1.0);
    let std_dev = variance.sqrt();

    if std_dev == 0.0 || !std_dev.is_finite() {
        return None;
    }

    candidates
        .iter()
        .enumerate()
        .map(|(pos, (_, v))| (pos, (v - mean).abs() / std_dev))
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

impl OutlierFilter for GrubbsFilter {
    fn outliers(&self, samples: &[f64]) -> Vec<usize> {
        let mut candidates: Vec<(usize, f64)> = samples.iter().copied().enumerate().collect();
        let mut rejected = Vec::new();

        while let Some(critical) = self.critical_value(candidates.len()) {
            let Some((pos, g)) = most_extreme(&candidates) else {
                break;
            };
            if g <= critical {
                break;
            }

            let (index, value) = candidates.remove(pos);
            tracing::debug!("Grubbs rejected sample {} (G={:.3} > {:.3})", value, g, critical);
            rejected.push(index);
        }

        rejected
    }

    fn name(&self) -> &'static str {
        "grubbs"
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_critical_value_table() {
        let filter = GrubbsFilter::new(0.05);
        // Published two-sided critical values at alpha = 0.05
        assert_relative_eq!(filter.critical_value(10).unwrap(), 2.290, epsilon = 0.01);
        assert_relative_eq!(filter.critical_value(20).unwrap(), 2.709, epsilon = 0.01);
        assert!(filter.critical_value(2).is_none());
    }

    #[test]
    fn test_rejects_single_spike() {
        let filter = GrubbsFilter::new(0.05);
        let samples = [510.0, 512.0, 509.0, 511.0, 510.0, 508.0, 512.0, 511.0, 3000.0, 510.0];

        assert_eq!(filter.outliers(&samples), vec![8]);
        let kept = filter.retain(&samples);
        assert_eq!(kept.len(), 9);
        assert!(kept.iter().all(|&v| v < 600.0));
    }

    #[test]
    fn test_keeps_clean_batch() {
        let filter = GrubbsFilter::new(0.05);
        let samples = [640.0, 642.0, 645.0, 641.0, 639.0, 643.0, 644.0];
        assert!(filter.outliers(&samples).is_empty());
    }

    #[test]
    fn test_too_few_samples() {
        let filter = GrubbsFilter::new(0.05);
        assert!(filter.outliers(&[]).is_empty());
        assert!(filter.outliers(&[500.0, 5000.0]).is_empty());
    }

    #[test]
    fn test_constant_samples() {
        let filter = GrubbsFilter::new(0.05);
        assert!(filter.outliers(&[700.0; 10]).is_empty());
    }
}
