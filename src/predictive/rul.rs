use chrono::{DateTime, Duration, Utc};

use crate::analyzer::stats;
use crate::types::Reading;

const SECS_PER_DAY: i64 = 86_400;
/// Largest day count a 32-bit integer column holds
const MAX_RUL_DAYS: i64 = i32::MAX as i64;

/// Outcome of a remaining-useful-life extrapolation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulEstimate {
    InsufficientData,
    NoIncreasingTrend,
    ThresholdReached,
    Days(i64),
}

impl RulEstimate {
    /// Remaining days, when a number can be given
    pub fn days(&self) -> Option<i64> {
        match self {
            RulEstimate::ThresholdReached => Some(0),
            RulEstimate::Days(d) => Some(*d),
            RulEstimate::InsufficientData | RulEstimate::NoIncreasingTrend => None,
        }
    }

    /// Status label stored alongside the prediction
    pub fn label(&self) -> &'static str {
        match self {
            RulEstimate::InsufficientData => "insufficient data",
            RulEstimate::NoIncreasingTrend => "no increasing trend",
            RulEstimate::ThresholdReached => "threshold already reached",
            RulEstimate::Days(_) => "prediction succeeded",
        }
    }
}

/// Linear-trend extrapolation of noise level to a critical threshold.
///
/// Fits one global line over the whole history; there is no change-point
/// detection, so an early plateau drags the slope down.
pub struct RulPredictor {
    threshold: f64,
    min_points: usize,
}

impl RulPredictor {
    pub fn new(threshold: f64, min_points: usize) -> Self {
        Self { threshold, min_points }
    }

    pub fn predict(&self, history: &[Reading], now: DateTime<Utc>) -> RulEstimate {
        if history.len() < self.min_points {
            return RulEstimate::InsufficientData;
        }
        let Some(first) = history.iter().map(|r| r.timestamp).min() else {
            return RulEstimate::InsufficientData;
        };

        let elapsed: Vec<f64> = history
            .iter()
            .map(|r| (r.timestamp - first).num_milliseconds() as f64 / 1000.0)
            .collect();
        let noise: Vec<f64> = history.iter().map(|r| r.noise_level).collect();

        // vertical data (all timestamps equal) has no usable trend either
        let Some((slope, intercept)) = stats::linear_regression(&elapsed, &noise) else {
            return RulEstimate::NoIncreasingTrend;
        };
        if slope <= 0.0 {
            return RulEstimate::NoIncreasingTrend;
        }

        let secs_to_threshold = (self.threshold - intercept) / slope;
        let max_elapsed = elapsed.iter().copied().fold(f64::MIN, f64::max);
        if secs_to_threshold <= max_elapsed {
            return RulEstimate::ThresholdReached;
        }

        // a crossing too far out for the store's integer column is no trend
        let crossing = Duration::try_milliseconds((secs_to_threshold * 1000.0) as i64)
            .and_then(|d| first.checked_add_signed(d));
        let Some(crossing) = crossing else {
            return RulEstimate::NoIncreasingTrend;
        };
        let days = (crossing - now).num_seconds().div_euclid(SECS_PER_DAY);
        if days > MAX_RUL_DAYS {
            tracing::debug!(slope, days, "Crossing beyond horizon, treating as flat");
            return RulEstimate::NoIncreasingTrend;
        }

        tracing::debug!(slope, intercept, secs_to_threshold, days, "Extrapolated RUL");
        RulEstimate::Days(days.max(0))
    }
}
