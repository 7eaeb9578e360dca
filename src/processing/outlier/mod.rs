pub mod grubbs;
pub mod none;

/// Pluggable rejection of transient outliers within one sample batch
pub trait OutlierFilter: Send + Sync {
    /// Indices of samples to drop
    fn outliers(&self, samples: &[f64]) -> Vec<usize>;

    /// Samples with the outliers removed, in original order
    fn retain(&self, samples: &[f64]) -> Vec<f64> {
        let mut rejected = self.outliers(samples);
        rejected.sort_unstable();

        samples
            .iter()
            .enumerate()
            .filter(|(i, _)| rejected.binary_search(i).is_err())
            .map(|(_, &v)| v)
            .collect()
    }

    fn name(&self) -> &'static str;
}

/// Configured outlier rejection
#[derive(Debug, Clone, Default)]
pub enum OutlierMethod {
    /// Keep every sample; one spike widens the calibration for good
    #[default]
    None,
    /// Grubbs' test at significance level `alpha`
    Grubbs { alpha: f64 },
}

impl OutlierMethod {
    pub fn create(&self) -> Box<dyn OutlierFilter> {
        match self {
            OutlierMethod::None => Box::new(none::KeepAll),
            OutlierMethod::Grubbs { alpha } => Box::new(grubbs::GrubbsFilter::new(*alpha)),
        }
    }
}
