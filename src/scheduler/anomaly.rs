use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;

use crate::alerter::{AlertDispatcher, EmitOutcome};
use crate::analyzer::Detector;
use crate::clock::Clock;
use crate::store::{MetricStore, SortOrder};
use crate::types::MetricId;
use super::Cycle;

/// Summary of one anomaly-detection cycle
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AnomalyReport {
    pub readings: usize,
    pub emitted: usize,
    pub suppressed: usize,
    pub failed: usize,
}

impl AnomalyReport {
    fn record(&mut self, outcome: EmitOutcome) {
        match outcome {
            EmitOutcome::Emitted => self.emitted += 1,
            EmitOutcome::Suppressed => self.suppressed += 1,
            EmitOutcome::Failed => self.failed += 1,
        }
    }
}

/// Fetches the recent window and runs every detector against the newest
/// reading of each tracked metric.
pub struct AnomalyCycle {
    store: Arc<dyn MetricStore>,
    clock: Arc<dyn Clock>,
    detectors: Vec<Box<dyn Detector>>,
    dispatcher: AlertDispatcher,
    window: Duration,
}

impl AnomalyCycle {
    pub fn new(
        store: Arc<dyn MetricStore>,
        clock: Arc<dyn Clock>,
        detectors: Vec<Box<dyn Detector>>,
        dispatcher: AlertDispatcher,
        window: Duration,
    ) -> Self {
        Self { store, clock, detectors, dispatcher, window }
    }

    pub fn dispatcher(&self) -> &AlertDispatcher {
        &self.dispatcher
    }

    pub async fn run_cycle(&mut self) -> Result<AnomalyReport> {
        // a window reaching past the calendar's start means everything
        let since = self.clock.now().checked_sub_signed(self.window);
        let mut readings = self
            .store
            .query_readings(since, SortOrder::Descending)
            .await
            .context("Failed to fetch recent readings")?;

        let mut report = AnomalyReport { readings: readings.len(), ..Default::default() };
        if readings.is_empty() {
            tracing::info!(window_secs = self.window.num_seconds(), "No readings in analysis window");
            return Ok(report);
        }
        // newest first, whatever the backend did
        readings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        for metric in MetricId::TRACKED {
            let values: Vec<f64> = readings.iter().map(|r| r.value(metric)).collect();

            for detector in &self.detectors {
                let Some(detection) = detector.evaluate(metric, &values) else {
                    continue;
                };
                tracing::debug!(%metric, detector = detector.name(), "Detector fired");
                let outcome = self
                    .dispatcher
                    .emit(metric, detection.severity, detection.message, detection.details)
                    .await;
                report.record(outcome);
            }
        }

        Ok(report)
    }
}

#[async_trait]
impl Cycle for AnomalyCycle {
    fn name(&self) -> &'static str { "anomaly" }

    async fn run_once(&mut self) -> Result<()> {
        let report = self.run_cycle().await?;
        tracing::info!(
            readings = report.readings,
            emitted = report.emitted,
            suppressed = report.suppressed,
            failed = report.failed,
            "Anomaly cycle complete"
        );
        Ok(())
    }
}
