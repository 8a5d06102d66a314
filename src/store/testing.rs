use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::memory::MemoryStore;
use super::{MetricStore, SortOrder, StoreError};
use crate::types::{Alert, Device, DeviceStatus, Prediction, Reading};

/// Store operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    QueryReadings,
    InsertAlert,
    UpsertPrediction,
    GetDevice,
    InsertDevice,
    UpdateDeviceStatus,
}

/// [`MemoryStore`] wrapper whose operations fail on demand
#[derive(Clone, Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    failing: Arc<Mutex<HashSet<Op>>>,
    attempts: Arc<Mutex<HashMap<Op, usize>>>,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self { inner, ..Self::default() }
    }

    pub fn fail(&self, op: Op) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn heal(&self, op: Op) {
        self.failing.lock().unwrap().remove(&op);
    }

    pub fn attempts(&self, op: Op) -> usize {
        self.attempts.lock().unwrap().get(&op).copied().unwrap_or(0)
    }

    fn check(&self, op: Op) -> Result<(), StoreError> {
        *self.attempts.lock().unwrap().entry(op).or_default() += 1;
        if self.failing.lock().unwrap().contains(&op) {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MetricStore for FlakyStore {
    async fn query_readings(
        &self,
        since: Option<DateTime<Utc>>,
        order: SortOrder,
    ) -> Result<Vec<Reading>, StoreError> {
        self.check(Op::QueryReadings)?;
        self.inner.query_readings(since, order).await
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        self.check(Op::InsertAlert)?;
        self.inner.insert_alert(alert).await
    }

    async fn upsert_prediction(&self, prediction: &Prediction) -> Result<(), StoreError> {
        self.check(Op::UpsertPrediction)?;
        self.inner.upsert_prediction(prediction).await
    }

    async fn get_device(&self, id: i64) -> Result<Option<Device>, StoreError> {
        self.check(Op::GetDevice)?;
        self.inner.get_device(id).await
    }

    async fn insert_device(&self, device: &Device) -> Result<(), StoreError> {
        self.check(Op::InsertDevice)?;
        self.inner.insert_device(device).await
    }

    async fn update_device_status(
        &self,
        id: i64,
        status: DeviceStatus,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.check(Op::UpdateDeviceStatus)?;
        self.inner.update_device_status(id, status, at).await
    }
}
