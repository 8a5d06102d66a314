use serde_json::json;

use crate::types::{MetricId, Severity};
use super::{Detection, Detector};

/// Sudden-increase detection between the two most recent readings.
pub struct SpikeDetector {
    sensitivity: f64,
}

impl SpikeDetector {
    pub fn new(sensitivity: f64) -> Self {
        Self { sensitivity }
    }

    /// True when `current` exceeds `previous * sensitivity`. Never fires for
    /// a non-positive previous value.
    pub fn is_spike(&self, previous: f64, current: f64) -> bool {
        previous > 0.0 && current > previous * self.sensitivity
    }
}

impl Detector for SpikeDetector {
    fn name(&self) -> &str { "spike" }

    fn evaluate(&self, metric: MetricId, values: &[f64]) -> Option<Detection> {
        let [current, previous, ..] = values else {
            return None;
        };
        if !self.is_spike(*previous, *current) {
            return None;
        }

        Some(Detection {
            severity: Severity::High,
            message: format!("{} spike detected (Spike)", metric),
            details: json!({ "from": previous, "to": current }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increase_must_be_strictly_greater() {
        let d = SpikeDetector::new(1.5);
        assert!(d.is_spike(10.0, 16.0));
        assert!(!d.is_spike(10.0, 15.0));
        assert!(!d.is_spike(10.0, 9.0));
    }

    #[test]
    fn non_positive_previous_never_fires() {
        let d = SpikeDetector::new(1.5);
        assert!(!d.is_spike(0.0, 100.0));
        assert!(!d.is_spike(-2.0, 100.0));
    }

    #[test]
    fn needs_two_readings() {
        let d = SpikeDetector::new(1.5);
        assert!(d.evaluate(MetricId::NoiseLevel, &[]).is_none());
        assert!(d.evaluate(MetricId::NoiseLevel, &[9.0]).is_none());
    }

    #[test]
    fn reports_from_and_to() {
        let d = SpikeDetector::new(1.5);
        let det = d.evaluate(MetricId::NoiseLevel, &[2.0, 1.0, 1.0]).unwrap();
        assert_eq!(det.severity, Severity::High);
        assert!(det.message.contains("Spike"));
        assert_eq!(det.details["from"], 1.0);
        assert_eq!(det.details["to"], 2.0);
    }
}
