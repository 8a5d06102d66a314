use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;

use crate::clock::Clock;
use crate::config::PredictiveConfig;
use crate::predictive::{classify_device, HealthScorer, RulEstimate, RulPredictor};
use crate::store::{MetricStore, SortOrder};
use crate::types::{Device, DeviceStatus, Prediction};
use super::Cycle;

/// Summary of one predictive-maintenance cycle
#[derive(Debug, Clone, PartialEq)]
pub struct PredictiveReport {
    pub device_id: i64,
    pub health_score: f64,
    pub rul: RulEstimate,
    pub status: DeviceStatus,
}

/// Scores the target device and persists its prediction and status.
pub struct PredictiveCycle {
    store: Arc<dyn MetricStore>,
    clock: Arc<dyn Clock>,
    device_id: i64,
    device_name: String,
    health_window: Duration,
    scorer: HealthScorer,
    predictor: RulPredictor,
}

impl PredictiveCycle {
    pub fn new(store: Arc<dyn MetricStore>, clock: Arc<dyn Clock>, config: &PredictiveConfig) -> Self {
        Self {
            store,
            clock,
            device_id: config.device_id,
            device_name: config.device_name(),
            health_window: config.health_window(),
            scorer: HealthScorer::new(config.weights, config.bounds),
            predictor: RulPredictor::new(config.noise_critical_threshold, config.rul_min_points),
        }
    }

    /// Create the device record with status `initializing` if it is missing.
    async fn ensure_device(&self) -> Result<()> {
        if self.store.get_device(self.device_id).await?.is_some() {
            return Ok(());
        }

        tracing::info!(device_id = self.device_id, name = %self.device_name, "Device not found, creating");
        let device = Device {
            id: self.device_id,
            name: self.device_name.clone(),
            status: DeviceStatus::Initializing,
            last_updated: None,
        };
        self.store.insert_device(&device).await?;
        Ok(())
    }

    pub async fn run_cycle(&mut self) -> Result<PredictiveReport> {
        // Not fatal: the device table may be managed elsewhere.
        if let Err(e) = self.ensure_device().await {
            tracing::warn!(device_id = self.device_id, error = %e, "Failed to ensure device record");
        }

        let now = self.clock.now();
        let recent = self
            .store
            .query_readings(now.checked_sub_signed(self.health_window), SortOrder::Descending)
            .await
            .context("Failed to fetch health window")?;
        let history = self
            .store
            .query_readings(None, SortOrder::Ascending)
            .await
            .context("Failed to fetch reading history")?;

        let health_score = self.scorer.score(&recent);
        let rul = self.predictor.predict(&history, now);
        let status = classify_device(health_score, rul.days());

        tracing::info!(
            device_id = self.device_id,
            health_score,
            rul_days = ?rul.days(),
            rul_status = rul.label(),
            "Predictive analysis complete"
        );

        let prediction = Prediction {
            device_id: self.device_id,
            rul_days: rul.days(),
            health_score,
            status: rul.label().to_string(),
            computed_at: now,
        };
        self.store
            .upsert_prediction(&prediction)
            .await
            .context("Failed to store prediction")?;

        self.store
            .update_device_status(self.device_id, status, now)
            .await
            .context("Failed to update device status")?;
        tracing::info!(device_id = self.device_id, %status, "Device status updated");

        Ok(PredictiveReport {
            device_id: self.device_id,
            health_score,
            rul,
            status,
        })
    }
}

#[async_trait]
impl Cycle for PredictiveCycle {
    fn name(&self) -> &'static str { "predictive" }

    async fn run_once(&mut self) -> Result<()> {
        self.run_cycle().await.map(|_| ())
    }
}
