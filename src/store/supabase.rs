use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::time::Duration;

use super::{MetricStore, SortOrder, StoreError};
use crate::config::StoreConfig;
use crate::types::{utc_timestamp, Alert, Device, DeviceStatus, Prediction, Reading};

/// Supabase (PostgREST) backed metric store
pub struct SupabaseStore {
    base_url: String,
    api_key: String,
    readings_table: String,
    alerts_table: String,
    predictions_table: String,
    devices_table: String,
    page_size: usize,
    client: Client,
}

#[derive(Serialize)]
struct PredictionRow<'a> {
    device_id: i64,
    predicted_rul_days: Option<i64>,
    health_score: f64,
    prediction_status: &'a str,
    created_at: String,
}

#[derive(Deserialize)]
struct DeviceRow {
    id: i64,
    #[serde(default)]
    device_name: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, deserialize_with = "utc_timestamp::deserialize_option")]
    last_updated: Option<DateTime<Utc>>,
}

impl SupabaseStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            readings_table: config.readings_table.clone(),
            alerts_table: config.alerts_table.clone(),
            predictions_table: config.predictions_table.clone(),
            devices_table: config.devices_table.clone(),
            page_size: config.page_size,
            client,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn execute(&self, req: RequestBuilder) -> Result<Response, StoreError> {
        let resp = self.authorized(req).send().await.map_err(map_request_error)?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(StoreError::Rejected { status: status.as_u16(), body })
    }

    async fn decode<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T, StoreError> {
        let bytes = resp.bytes().await.map_err(map_request_error)?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode(e.to_string()))
    }
}

fn map_request_error(e: reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::Timeout
    } else {
        StoreError::Request(e)
    }
}

fn timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Drain an offset-paged listing. `fetch(offset, limit)` is called until a
/// page comes back shorter than `page_size`.
async fn collect_pages<T, F, Fut>(page_size: usize, mut fetch: F) -> Result<Vec<T>, StoreError>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>, StoreError>>,
{
    let mut rows = Vec::new();
    loop {
        let page = fetch(rows.len(), page_size).await?;
        let last = page.len() < page_size;
        rows.extend(page);
        if last {
            return Ok(rows);
        }
    }
}

fn order_param(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Ascending => "log_timestamp.asc",
        SortOrder::Descending => "log_timestamp.desc",
    }
}

#[async_trait]
impl MetricStore for SupabaseStore {
    async fn query_readings(
        &self,
        since: Option<DateTime<Utc>>,
        order: SortOrder,
    ) -> Result<Vec<Reading>, StoreError> {
        let mut query: Vec<(&str, String)> = vec![
            ("select", "*".to_string()),
            ("order", order_param(order).to_string()),
        ];
        if let Some(since) = since {
            query.push(("log_timestamp", format!("gte.{}", timestamp(since))));
        }

        // PostgREST caps each response at max-rows, so read in pages
        let url = self.table_url(&self.readings_table);
        let readings = collect_pages(self.page_size, |offset, limit| {
            let req = self
                .client
                .get(&url)
                .query(&query)
                .query(&[("limit", limit), ("offset", offset)]);
            async move {
                let resp = self.execute(req).await?;
                Self::decode::<Vec<Reading>>(resp).await
            }
        })
        .await?;

        tracing::debug!(rows = readings.len(), "Fetched readings");
        Ok(readings)
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        let payload = json!({
            "metric": alert.metric.as_str(),
            "severity": alert.severity.to_string(),
            "message": &alert.message,
            "details": &alert.details,
        });

        let req = self
            .client
            .post(self.table_url(&self.alerts_table))
            .header("Prefer", "return=minimal")
            .json(&payload);
        self.execute(req).await?;
        Ok(())
    }

    async fn upsert_prediction(&self, prediction: &Prediction) -> Result<(), StoreError> {
        let row = PredictionRow {
            device_id: prediction.device_id,
            predicted_rul_days: prediction.rul_days,
            health_score: prediction.health_score,
            prediction_status: &prediction.status,
            created_at: timestamp(prediction.computed_at),
        };

        let req = self
            .client
            .post(self.table_url(&self.predictions_table))
            .query(&[("on_conflict", "device_id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&row);
        self.execute(req).await?;
        Ok(())
    }

    async fn get_device(&self, id: i64) -> Result<Option<Device>, StoreError> {
        let req = self
            .client
            .get(self.table_url(&self.devices_table))
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", id))]);
        let resp = self.execute(req).await?;
        let rows: Vec<DeviceRow> = Self::decode(resp).await?;

        Ok(rows.into_iter().next().map(|row| {
            let status = match row.status.as_deref().map(DeviceStatus::parse) {
                Some(Some(s)) => s,
                Some(None) => {
                    tracing::warn!(device_id = row.id, status = ?row.status, "Unknown device status");
                    DeviceStatus::Initializing
                }
                None => DeviceStatus::Initializing,
            };
            Device {
                id: row.id,
                name: row.device_name.unwrap_or_default(),
                status,
                last_updated: row.last_updated,
            }
        }))
    }

    async fn insert_device(&self, device: &Device) -> Result<(), StoreError> {
        let mut payload = json!({
            "id": device.id,
            "device_name": &device.name,
            "status": device.status.as_str(),
        });
        if let Some(ts) = device.last_updated {
            payload["last_updated"] = json!(timestamp(ts));
        }

        let req = self
            .client
            .post(self.table_url(&self.devices_table))
            .header("Prefer", "return=minimal")
            .json(&payload);
        self.execute(req).await?;
        Ok(())
    }

    async fn update_device_status(
        &self,
        id: i64,
        status: DeviceStatus,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let payload = json!({
            "status": status.as_str(),
            "last_updated": timestamp(at),
        });

        let req = self
            .client
            .patch(self.table_url(&self.devices_table))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=minimal")
            .json(&payload);
        self.execute(req).await?;
        Ok(())
    }
}
