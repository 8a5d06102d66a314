use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::clock::Clock;
use crate::store::MetricStore;
use crate::types::{Alert, MetricId, Severity};

/// Result of a single emission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    /// Alert persisted, cooldown armed
    Emitted,
    /// Dropped because the metric is still cooling down
    Suppressed,
    /// The store rejected the write; cooldown left untouched
    Failed,
}

/// Per-metric last-emission timestamps
#[derive(Debug)]
pub struct CooldownState {
    window: Duration,
    last_sent: HashMap<MetricId, DateTime<Utc>>,
}

impl CooldownState {
    pub fn new(window: Duration) -> Self {
        Self { window, last_sent: HashMap::new() }
    }

    pub fn is_cooling(&self, metric: MetricId, now: DateTime<Utc>) -> bool {
        self.last_sent
            .get(&metric)
            .is_some_and(|last| now - *last < self.window)
    }

    pub fn record(&mut self, metric: MetricId, at: DateTime<Utc>) {
        self.last_sent.insert(metric, at);
    }

    pub fn last_sent(&self, metric: MetricId) -> Option<DateTime<Utc>> {
        self.last_sent.get(&metric).copied()
    }
}

/// Deduplicates and persists alerts.
///
/// Owns the cooldown state outright; `emit` takes `&mut self`, so the
/// check-then-record sequence cannot interleave with another emission.
pub struct AlertDispatcher {
    store: Arc<dyn MetricStore>,
    clock: Arc<dyn Clock>,
    cooldown: CooldownState,
}

impl AlertDispatcher {
    pub fn new(store: Arc<dyn MetricStore>, clock: Arc<dyn Clock>, cooldown: Duration) -> Self {
        tracing::info!(cooldown_secs = cooldown.num_seconds(), "Initialized alert dispatcher");
        Self {
            store,
            clock,
            cooldown: CooldownState::new(cooldown),
        }
    }

    pub fn cooldown(&self) -> &CooldownState {
        &self.cooldown
    }

    pub async fn emit(
        &mut self,
        metric: MetricId,
        severity: Severity,
        message: String,
        details: serde_json::Value,
    ) -> EmitOutcome {
        let now = self.clock.now();

        if self.cooldown.is_cooling(metric, now) {
            tracing::debug!(%metric, %severity, message = %message, "Alert suppressed (cooldown)");
            return EmitOutcome::Suppressed;
        }

        let alert = Alert {
            metric,
            severity,
            message,
            details,
            timestamp: now,
        };

        match self.store.insert_alert(&alert).await {
            Ok(()) => {
                self.cooldown.record(metric, now);
                tracing::warn!(
                    %metric,
                    %severity,
                    details = %alert.details,
                    "Alert raised: {}",
                    alert.message
                );
                EmitOutcome::Emitted
            }
            Err(e) => {
                tracing::error!(%metric, error = %e, "Failed to persist alert");
                EmitOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::memory::MemoryStore;
    use crate::store::testing::{FlakyStore, Op};
    use chrono::TimeZone;
    use serde_json::json;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn setup() -> (MemoryStore, Arc<ManualClock>, AlertDispatcher) {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(start()));
        let dispatcher = AlertDispatcher::new(
            Arc::new(store.clone()),
            clock.clone(),
            Duration::seconds(300),
        );
        (store, clock, dispatcher)
    }

    async fn emit_noise(d: &mut AlertDispatcher, severity: Severity) -> EmitOutcome {
        d.emit(MetricId::NoiseLevel, severity, "noise_level test".into(), json!({})).await
    }

    #[tokio::test]
    async fn second_emit_within_window_is_suppressed() {
        let (store, clock, mut d) = setup();

        assert_eq!(emit_noise(&mut d, Severity::Warning).await, EmitOutcome::Emitted);
        clock.advance(Duration::seconds(299));
        assert_eq!(emit_noise(&mut d, Severity::Critical).await, EmitOutcome::Suppressed);

        assert_eq!(store.alerts().len(), 1);
    }

    #[tokio::test]
    async fn emits_again_once_window_elapsed() {
        let (store, clock, mut d) = setup();

        assert_eq!(emit_noise(&mut d, Severity::Warning).await, EmitOutcome::Emitted);
        clock.advance(Duration::seconds(300));
        assert_eq!(emit_noise(&mut d, Severity::Warning).await, EmitOutcome::Emitted);

        let alerts = store.alerts();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[1].timestamp, start() + Duration::seconds(300));
    }

    #[tokio::test]
    async fn cooldown_is_per_metric() {
        let (store, _clock, mut d) = setup();

        assert_eq!(emit_noise(&mut d, Severity::High).await, EmitOutcome::Emitted);
        let other = d
            .emit(MetricId::Temperature, Severity::High, "temperature test".into(), json!({}))
            .await;
        assert_eq!(other, EmitOutcome::Emitted);
        assert_eq!(store.alerts().len(), 2);
    }

    #[tokio::test]
    async fn failed_write_does_not_arm_cooldown() {
        let store = FlakyStore::default();
        store.fail(Op::InsertAlert);
        let clock = Arc::new(ManualClock::new(start()));
        let mut d = AlertDispatcher::new(Arc::new(store.clone()), clock.clone(), Duration::seconds(300));

        assert_eq!(emit_noise(&mut d, Severity::Critical).await, EmitOutcome::Failed);
        assert_eq!(d.cooldown().last_sent(MetricId::NoiseLevel), None);

        clock.advance(Duration::seconds(10));
        store.heal(Op::InsertAlert);
        assert_eq!(emit_noise(&mut d, Severity::Critical).await, EmitOutcome::Emitted);
        assert_eq!(store.attempts(Op::InsertAlert), 2);
        assert_eq!(store.inner.alerts().len(), 1);
        assert_eq!(
            d.cooldown().last_sent(MetricId::NoiseLevel),
            Some(start() + Duration::seconds(10))
        );
    }
}
