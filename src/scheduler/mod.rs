//! Periodic drivers for the anomaly and predictive cycles.
//!
//! Each loop owns its [`Cycle`] and awaits it to completion before waiting
//! on the next tick, so two cycles of the same loop never overlap. Errors
//! from a cycle are logged and the loop carries on; only cancellation stops it.

pub mod anomaly;
pub mod predictive;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub use anomaly::{AnomalyCycle, AnomalyReport};
pub use predictive::{PredictiveCycle, PredictiveReport};

/// One unit of periodic work
#[async_trait]
pub trait Cycle: Send {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Run a single cycle to completion
    async fn run_once(&mut self) -> Result<()>;
}

/// Run `cycle` every `period` until `cancel` fires. The first cycle starts
/// immediately. Returns the number of cycles run.
pub async fn run_loop<C: Cycle>(mut cycle: C, period: Duration, cancel: CancellationToken) -> u64 {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut runs = 0u64;

    tracing::info!(
        cycle = cycle.name(),
        interval_secs = period.as_secs(),
        "Loop started"
    );

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(cycle = cycle.name(), runs, "Loop stopping");
                break;
            }
            _ = interval.tick() => {
                runs += 1;
                if let Err(e) = cycle.run_once().await {
                    tracing::error!(cycle = cycle.name(), error = %format!("{:#}", e), "Cycle failed");
                }
            }
        }
    }

    runs
}
