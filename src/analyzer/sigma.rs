use serde_json::json;

use crate::types::{MetricId, Severity};
use super::{round2, stats, Detection, Detector};

/// Rolling 3-sigma outlier detection.
/// Flags a current value above the window mean plus `factor` sample deviations.
pub struct SigmaDetector {
    factor: f64,
    min_points: usize,
}

impl SigmaDetector {
    pub fn new(factor: f64, min_points: usize) -> Self {
        Self { factor, min_points }
    }

    /// Window mean and upper bound, or `None` below the minimum sample count
    pub fn upper_bound(&self, values: &[f64]) -> Option<(f64, f64)> {
        if values.len() < self.min_points {
            return None;
        }
        let mean = stats::mean(values)?;
        let std = stats::sample_std_dev(values)?;
        Some((mean, mean + self.factor * std))
    }
}

impl Detector for SigmaDetector {
    fn name(&self) -> &str { "sigma" }

    fn evaluate(&self, metric: MetricId, values: &[f64]) -> Option<Detection> {
        let (mean, upper_bound) = self.upper_bound(values)?;
        let value = *values.first()?;
        if value <= upper_bound {
            return None;
        }

        Some(Detection {
            severity: Severity::High,
            message: format!("{} exceeded 3-sigma upper bound (3-Sigma exceeded)", metric),
            details: json!({
                "value": value,
                "mean": round2(mean),
                "upper_bound": round2(upper_bound),
            }),
        })
    }
}
