pub mod sigma;
pub mod spike;
pub mod stats;
pub mod threshold;

use crate::config::Config;
use crate::types::{MetricId, Severity};

/// A rule that fired for one metric, ready to be handed to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub severity: Severity,
    pub message: String,
    pub details: serde_json::Value,
}

/// Trait for anomaly detection rules.
///
/// `values` holds every reading of `metric` in the analysis window, newest
/// first; `values[0]` is the current value.
pub trait Detector: Send + Sync {
    /// Human-readable name for this detector
    fn name(&self) -> &str;

    /// Evaluate the window and return a detection if the rule fires
    fn evaluate(&self, metric: MetricId, values: &[f64]) -> Option<Detection>;
}

/// Create the configured detectors in evaluation order: threshold, spike, sigma.
///
/// The order matters: the dispatcher's per-metric cooldown means only the
/// first rule to fire for a metric in a cycle gets persisted.
pub fn create_detectors(config: &Config) -> Vec<Box<dyn Detector>> {
    let mut detectors: Vec<Box<dyn Detector>> = Vec::new();

    detectors.push(Box::new(threshold::ThresholdDetector::new(&config.thresholds)));
    if config.anomaly.spike_enabled {
        detectors.push(Box::new(spike::SpikeDetector::new(config.anomaly.spike_sensitivity)));
    }
    if config.anomaly.sigma_enabled {
        detectors.push(Box::new(sigma::SigmaDetector::new(
            config.anomaly.sigma_factor,
            config.anomaly.sigma_min_points,
        )));
    }

    tracing::info!(count = detectors.len(), "Initialized detectors");
    detectors
}

/// Round to two decimals for reporting
pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
