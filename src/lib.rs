pub mod alerter;
pub mod analyzer;
pub mod clock;
pub mod config;
pub mod predictive;
pub mod scheduler;
pub mod store;

/// Common types used across modules
pub mod types {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};

    /// A single sensor-health reading as stored by the data source
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Reading {
        #[serde(rename = "log_timestamp", deserialize_with = "utc_timestamp::deserialize")]
        pub timestamp: DateTime<Utc>,
        pub temperature: f64,
        pub noise_level: f64,
        pub dead_pixel_count: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub device_id: Option<i64>,
    }

    impl Reading {
        /// Value of the given tracked metric for this reading
        pub fn value(&self, metric: MetricId) -> f64 {
            match metric {
                MetricId::Temperature => self.temperature,
                MetricId::NoiseLevel => self.noise_level,
                MetricId::DeadPixelCount => self.dead_pixel_count,
            }
        }
    }

    /// Metric identifier
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MetricId {
        Temperature,
        NoiseLevel,
        DeadPixelCount,
    }

    impl MetricId {
        /// Metrics analysed by the anomaly loop, in evaluation order
        pub const TRACKED: [MetricId; 3] = [
            MetricId::Temperature,
            MetricId::NoiseLevel,
            MetricId::DeadPixelCount,
        ];

        pub fn as_str(&self) -> &'static str {
            match self {
                MetricId::Temperature => "temperature",
                MetricId::NoiseLevel => "noise_level",
                MetricId::DeadPixelCount => "dead_pixel_count",
            }
        }
    }

    /// Alert severity levels
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Severity {
        Warning,
        High,
        Critical,
    }

    /// An alert persisted by the dispatcher
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct Alert {
        pub metric: MetricId,
        pub severity: Severity,
        pub message: String,
        pub details: serde_json::Value,
        #[serde(rename = "created_at")]
        pub timestamp: DateTime<Utc>,
    }

    /// Discrete device condition derived from health score and RUL
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum DeviceStatus {
        Initializing,
        Healthy,
        Warning,
        PredictiveWarning,
        Critical,
    }

    impl DeviceStatus {
        pub fn as_str(&self) -> &'static str {
            match self {
                DeviceStatus::Initializing => "initializing",
                DeviceStatus::Healthy => "healthy",
                DeviceStatus::Warning => "warning",
                DeviceStatus::PredictiveWarning => "predictive_warning",
                DeviceStatus::Critical => "critical",
            }
        }

        pub fn parse(s: &str) -> Option<Self> {
            match s {
                "initializing" => Some(DeviceStatus::Initializing),
                "healthy" => Some(DeviceStatus::Healthy),
                "warning" => Some(DeviceStatus::Warning),
                "predictive_warning" => Some(DeviceStatus::PredictiveWarning),
                "critical" => Some(DeviceStatus::Critical),
                _ => None,
            }
        }
    }

    /// A monitored device record
    #[derive(Debug, Clone, PartialEq)]
    pub struct Device {
        pub id: i64,
        pub name: String,
        pub status: DeviceStatus,
        pub last_updated: Option<DateTime<Utc>>,
    }

    /// Latest predictive-maintenance summary for a device
    #[derive(Debug, Clone, PartialEq)]
    pub struct Prediction {
        pub device_id: i64,
        pub rul_days: Option<i64>,
        pub health_score: f64,
        pub status: String,
        pub computed_at: DateTime<Utc>,
    }

    impl std::fmt::Display for Severity {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Severity::Warning => write!(f, "warning"),
                Severity::High => write!(f, "high"),
                Severity::Critical => write!(f, "critical"),
            }
        }
    }

    impl std::fmt::Display for MetricId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.as_str())
        }
    }

    impl std::fmt::Display for DeviceStatus {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.as_str())
        }
    }

    /// Timestamps written without an offset (`timestamp` columns) are UTC.
    pub mod utc_timestamp {
        use chrono::{DateTime, NaiveDateTime, ParseError, Utc};
        use serde::{Deserialize, Deserializer};

        pub fn parse(raw: &str) -> Result<DateTime<Utc>, ParseError> {
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc()))
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").map(|n| n.and_utc()))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
            let raw = String::deserialize(d)?;
            parse(&raw).map_err(serde::de::Error::custom)
        }

        pub fn deserialize_option<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<String>::deserialize(d)?
                .map(|raw| parse(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }

    }
}
