//! Metric store boundary.
//!
//! The analysers never talk to a database directly; they go through
//! [`MetricStore`], which covers the handful of read/write operations the
//! two loops need. [`supabase::SupabaseStore`] is the production adapter,
//! [`memory::MemoryStore`] keeps everything in process.

pub mod memory;
pub mod supabase;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{Alert, Device, DeviceStatus, Prediction, Reading};

/// Errors raised at the store boundary. All of them are treated as
/// transient by the loops: logged, and retried on the next tick.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("store rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to decode store response: {0}")]
    Decode(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Sort direction for reading queries, by timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Readings at or after `since` (all readings when `None`), ordered by timestamp
    async fn query_readings(
        &self,
        since: Option<DateTime<Utc>>,
        order: SortOrder,
    ) -> Result<Vec<Reading>, StoreError>;

    async fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError>;

    /// Insert or overwrite the prediction for `prediction.device_id`
    async fn upsert_prediction(&self, prediction: &Prediction) -> Result<(), StoreError>;

    async fn get_device(&self, id: i64) -> Result<Option<Device>, StoreError>;

    async fn insert_device(&self, device: &Device) -> Result<(), StoreError>;

    async fn update_device_status(
        &self,
        id: i64,
        status: DeviceStatus,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}
