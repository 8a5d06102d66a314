//! End-to-end tests for the predictive-maintenance loop

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

use sensor_health_agent::clock::{Clock, ManualClock};
use sensor_health_agent::config::PredictiveConfig;
use sensor_health_agent::predictive::RulEstimate;
use sensor_health_agent::scheduler::PredictiveCycle;
use sensor_health_agent::store::memory::MemoryStore;
use sensor_health_agent::types::{DeviceStatus, Reading};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap()
}

/// Hourly readings for `hours`, noise rising linearly by `per_hour`
fn degrading(hours: i64, noise0: f64, per_hour: f64) -> Vec<Reading> {
    (0..hours)
        .map(|h| Reading {
            timestamp: start() + Duration::hours(h),
            temperature: 30.0,
            noise_level: noise0 + per_hour * h as f64,
            dead_pixel_count: 8.0,
            device_id: Some(1),
        })
        .collect()
}

#[tokio::test]
async fn e2e_slow_degradation_is_predictive_warning() {
    // 0.5 -> 5.0 over 900 hours; after 72 hours of data, ~34 days remain
    let store = MemoryStore::with_readings(degrading(72, 0.5, 0.005));
    let clock = Arc::new(ManualClock::new(start() + Duration::hours(72)));
    let mut cycle = PredictiveCycle::new(Arc::new(store.clone()), clock.clone(), &PredictiveConfig::default());

    let report = cycle.run_cycle().await.unwrap();
    assert_eq!(report.rul, RulEstimate::Days(34));
    // healthy score, RUL above 30 days
    assert!(report.health_score > 80.0, "score {}", report.health_score);
    assert_eq!(report.status, DeviceStatus::Healthy);

    // a week later, with the trend continuing, the crossing is inside 30 days
    for r in degrading(240, 0.5, 0.005).into_iter().skip(72) {
        store.push_reading(r);
    }
    clock.advance(Duration::days(7));
    let report = cycle.run_cycle().await.unwrap();
    assert_eq!(report.rul, RulEstimate::Days(27));
    assert_eq!(report.status, DeviceStatus::PredictiveWarning);

    let prediction = store.prediction(1).unwrap();
    assert_eq!(prediction.rul_days, Some(27));
    assert_eq!(prediction.status, "prediction succeeded");
    assert_eq!(prediction.computed_at, clock.now());
    assert_eq!(store.device(1).unwrap().status, DeviceStatus::PredictiveWarning);
}

#[tokio::test]
async fn e2e_failed_sensor_is_critical() {
    // noise already past 5.0 within the recorded history
    let store = MemoryStore::with_readings(degrading(24, 1.0, 0.3));
    let clock = Arc::new(ManualClock::new(start() + Duration::hours(24)));
    let mut cycle = PredictiveCycle::new(Arc::new(store.clone()), clock, &PredictiveConfig::default());

    let report = cycle.run_cycle().await.unwrap();
    assert_eq!(report.rul, RulEstimate::ThresholdReached);
    assert_eq!(report.status, DeviceStatus::Critical);

    let prediction = store.prediction(1).unwrap();
    assert_eq!(prediction.rul_days, Some(0));
    assert_eq!(prediction.status, "threshold already reached");
    assert_eq!(store.device(1).unwrap().status, DeviceStatus::Critical);
}

#[tokio::test]
async fn e2e_health_window_excludes_old_readings() {
    let mut readings = degrading(48, 0.5, 0.0);
    // large temperature swing two days ago, outside the 24h window
    readings[0].temperature = 90.0;
    readings[1].temperature = 10.0;
    let store = MemoryStore::with_readings(readings);
    let clock = Arc::new(ManualClock::new(start() + Duration::hours(47)));
    let mut cycle = PredictiveCycle::new(Arc::new(store.clone()), clock, &PredictiveConfig::default());

    let report = cycle.run_cycle().await.unwrap();
    assert_eq!(report.health_score, 100.0);
}
