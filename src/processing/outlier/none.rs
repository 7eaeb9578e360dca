use super::OutlierFilter;

/// Pass-through filter
pub struct KeepAll;

impl OutlierFilter for KeepAll {
    fn outliers(&self, _samples: &[f64]) -> Vec<usize> {
        Vec::new()
    }

    fn retain(&self, samples: &[f64]) -> Vec<f64> {
        samples.to_vec()
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_all() {
        let samples = [510.0, 512.0, 2000.0, 509.0];
        assert!(KeepAll.outliers(&samples).is_empty());
        assert_eq!(KeepAll.retain(&samples), samples.to_vec());
    }
}
