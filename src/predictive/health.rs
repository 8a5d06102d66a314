use crate::analyzer::{round2, stats};
use crate::config::{HealthWeights, NormalizationBounds};
use crate::types::Reading;

/// Map a raw value onto [0, 1], lower raw values scoring higher
pub fn normalize(value: f64, (min, max): (f64, f64)) -> f64 {
    (1.0 - (value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Composite 0-100 health score over a trailing window of readings.
pub struct HealthScorer {
    weights: HealthWeights,
    bounds: NormalizationBounds,
}

impl HealthScorer {
    pub fn new(weights: HealthWeights, bounds: NormalizationBounds) -> Self {
        Self { weights, bounds }
    }

    /// Score the window. Order of `readings` does not matter; the newest and
    /// oldest points are picked by timestamp. An empty window scores 0.
    pub fn score(&self, readings: &[Reading]) -> f64 {
        let (Some(newest), Some(oldest)) = (
            readings.iter().max_by_key(|r| r.timestamp),
            readings.iter().min_by_key(|r| r.timestamp),
        ) else {
            return 0.0;
        };

        let temps: Vec<f64> = readings.iter().map(|r| r.temperature).collect();
        // a single reading has no spread
        let temp_std = stats::sample_std_dev(&temps).unwrap_or(0.0);
        let pixel_growth = if readings.len() > 1 {
            newest.dead_pixel_count - oldest.dead_pixel_count
        } else {
            0.0
        };

        let temp_score = normalize(temp_std, self.bounds.temp_std);
        let noise_score = normalize(newest.noise_level, self.bounds.noise_level);
        let pixel_score = normalize(pixel_growth, self.bounds.pixel_growth);

        let w = &self.weights;
        let score = (temp_score * w.temp_stability
            + noise_score * w.noise_level
            + pixel_score * w.pixel_growth)
            * 100.0;

        tracing::debug!(
            temp_std,
            noise = newest.noise_level,
            pixel_growth,
            score,
            "Computed health score"
        );

        round2(score)
    }
}
