use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{MetricStore, SortOrder, StoreError};
use crate::types::{Alert, Device, DeviceStatus, Prediction, Reading};

/// Thread-safe in-process store
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    readings: Vec<Reading>,
    alerts: Vec<Alert>,
    predictions: HashMap<i64, Prediction>,
    devices: HashMap<i64, Device>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_readings(readings: impl IntoIterator<Item = Reading>) -> Self {
        let store = Self::new();
        for r in readings {
            store.push_reading(r);
        }
        store
    }

    pub fn push_reading(&self, reading: Reading) {
        self.write().readings.push(reading);
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.read().alerts.clone()
    }

    pub fn prediction(&self, device_id: i64) -> Option<Prediction> {
        self.read().predictions.get(&device_id).cloned()
    }

    pub fn device(&self, id: i64) -> Option<Device> {
        self.read().devices.get(&id).cloned()
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl MetricStore for MemoryStore {
    async fn query_readings(
        &self,
        since: Option<DateTime<Utc>>,
        order: SortOrder,
    ) -> Result<Vec<Reading>, StoreError> {
        let mut readings: Vec<Reading> = self
            .read()
            .readings
            .iter()
            .filter(|r| since.map_or(true, |s| r.timestamp >= s))
            .cloned()
            .collect();

        readings.sort_by_key(|r| r.timestamp);
        if order == SortOrder::Descending {
            readings.reverse();
        }
        Ok(readings)
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        self.write().alerts.push(alert.clone());
        Ok(())
    }

    async fn upsert_prediction(&self, prediction: &Prediction) -> Result<(), StoreError> {
        self.write()
            .predictions
            .insert(prediction.device_id, prediction.clone());
        Ok(())
    }

    async fn get_device(&self, id: i64) -> Result<Option<Device>, StoreError> {
        Ok(self.device(id))
    }

    async fn insert_device(&self, device: &Device) -> Result<(), StoreError> {
        let mut inner = self.write();
        if inner.devices.contains_key(&device.id) {
            return Err(StoreError::Rejected {
                status: 409,
                body: format!("device {} already exists", device.id),
            });
        }
        inner.devices.insert(device.id, device.clone());
        Ok(())
    }

    async fn update_device_status(
        &self,
        id: i64,
        status: DeviceStatus,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        // Matches an UPDATE ... WHERE id = ?: a missing row is not an error.
        if let Some(device) = self.write().devices.get_mut(&id) {
            device.status = status;
            device.last_updated = Some(at);
        }
        Ok(())
    }
}
