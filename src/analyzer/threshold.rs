use serde_json::json;

use crate::config::{Bounds, ThresholdConfig};
use crate::types::{MetricId, Severity};
use super::{Detection, Detector};

/// Classify a value against a warning/critical pair. Bounds are inclusive.
pub fn classify(value: f64, bounds: Bounds) -> Option<(Severity, f64)> {
    if value >= bounds.critical {
        Some((Severity::Critical, bounds.critical))
    } else if value >= bounds.warning {
        Some((Severity::Warning, bounds.warning))
    } else {
        None
    }
}

/// Static threshold detection.
/// Compares the current value against configured warning/critical bounds.
pub struct ThresholdDetector {
    thresholds: ThresholdConfig,
}

impl ThresholdDetector {
    pub fn new(config: &ThresholdConfig) -> Self {
        Self { thresholds: config.clone() }
    }
}

impl Detector for ThresholdDetector {
    fn name(&self) -> &str { "threshold" }

    fn evaluate(&self, metric: MetricId, values: &[f64]) -> Option<Detection> {
        let value = *values.first()?;
        let (severity, threshold) = classify(value, self.thresholds.for_metric(metric))?;

        let level = match severity {
            Severity::Critical => "Critical",
            _ => "Warning",
        };

        Some(Detection {
            severity,
            message: format!("{} threshold exceeded ({})", metric, level),
            details: json!({ "value": value, "threshold": threshold }),
        })
    }
}
