use anyhow::{bail, Context, Result};
use chrono::Duration;
use serde::Deserialize;
use std::path::Path;

use crate::types::MetricId;

/// Upper bound for any configured period or window (ten years)
const MAX_PERIOD_SECS: u64 = 10 * 365 * 86_400;

/// Top-level configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub anomaly: AnomalyConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub predictive: PredictiveConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_env_file")]
    pub env_file: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            env_file: default_env_file(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Rows per request when reading; keep at or below the server's max-rows
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_readings_table")]
    pub readings_table: String,
    #[serde(default = "default_alerts_table")]
    pub alerts_table: String,
    #[serde(default = "default_predictions_table")]
    pub predictions_table: String,
    #[serde(default = "default_devices_table")]
    pub devices_table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            request_timeout_secs: default_request_timeout(),
            page_size: default_page_size(),
            readings_table: default_readings_table(),
            alerts_table: default_alerts_table(),
            predictions_table: default_predictions_table(),
            devices_table: default_devices_table(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnomalyConfig {
    #[serde(default = "default_anomaly_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_anomaly_window")]
    pub window_secs: u64,
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
    #[serde(default = "default_true")]
    pub spike_enabled: bool,
    #[serde(default = "default_spike_sensitivity")]
    pub spike_sensitivity: f64,
    #[serde(default = "default_true")]
    pub sigma_enabled: bool,
    #[serde(default = "default_sigma_factor")]
    pub sigma_factor: f64,
    #[serde(default = "default_sigma_min_points")]
    pub sigma_min_points: usize,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            window_secs: 3600,
            cooldown_secs: 300,
            spike_enabled: true,
            spike_sensitivity: 1.5,
            sigma_enabled: true,
            sigma_factor: 3.0,
            sigma_min_points: 11,
        }
    }
}

/// Warning/critical bound pair for a single metric
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub warning: f64,
    pub critical: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ThresholdConfig {
    #[serde(default = "default_temperature_bounds")]
    pub temperature: Bounds,
    #[serde(default = "default_noise_bounds")]
    pub noise_level: Bounds,
    #[serde(default = "default_pixel_bounds")]
    pub dead_pixel_count: Bounds,
}

impl ThresholdConfig {
    pub fn for_metric(&self, metric: MetricId) -> Bounds {
        match metric {
            MetricId::Temperature => self.temperature,
            MetricId::NoiseLevel => self.noise_level,
            MetricId::DeadPixelCount => self.dead_pixel_count,
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature_bounds(),
            noise_level: default_noise_bounds(),
            dead_pixel_count: default_pixel_bounds(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PredictiveConfig {
    #[serde(default = "default_predictive_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_device_id")]
    pub device_id: i64,
    pub device_name: Option<String>,
    #[serde(default = "default_health_window")]
    pub health_window_hours: u32,
    #[serde(default = "default_noise_critical")]
    pub noise_critical_threshold: f64,
    #[serde(default = "default_rul_min_points")]
    pub rul_min_points: usize,
    #[serde(default)]
    pub weights: HealthWeights,
    #[serde(default)]
    pub bounds: NormalizationBounds,
}

impl AnomalyConfig {
    /// Trailing analysis window
    pub fn window(&self) -> Duration {
        seconds(self.window_secs)
    }

    pub fn cooldown(&self) -> Duration {
        seconds(self.cooldown_secs)
    }
}

impl PredictiveConfig {
    pub fn health_window(&self) -> Duration {
        seconds(u64::from(self.health_window_hours) * 3600)
    }

    pub fn device_name(&self) -> String {
        self.device_name
            .clone()
            .unwrap_or_else(|| format!("Simulated-CMOS-{}", self.device_id))
    }
}

impl Default for PredictiveConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            device_id: 1,
            device_name: None,
            health_window_hours: 24,
            noise_critical_threshold: 5.0,
            rul_min_points: 10,
            weights: HealthWeights::default(),
            bounds: NormalizationBounds::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct HealthWeights {
    #[serde(default = "default_weight_temp")]
    pub temp_stability: f64,
    #[serde(default = "default_weight_noise")]
    pub noise_level: f64,
    #[serde(default = "default_weight_pixel")]
    pub pixel_growth: f64,
}

impl Default for HealthWeights {
    fn default() -> Self {
        Self { temp_stability: 0.3, noise_level: 0.5, pixel_growth: 0.2 }
    }
}

/// Expected (min, max) range of each raw health sub-metric
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct NormalizationBounds {
    #[serde(default = "default_temp_std_range")]
    pub temp_std: (f64, f64),
    #[serde(default = "default_noise_range")]
    pub noise_level: (f64, f64),
    #[serde(default = "default_pixel_growth_range")]
    pub pixel_growth: (f64, f64),
}

impl Default for NormalizationBounds {
    fn default() -> Self {
        Self {
            temp_std: default_temp_std_range(),
            noise_level: default_noise_range(),
            pixel_growth: default_pixel_growth_range(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file. A missing file yields defaults.
    ///
    /// Store credentials left empty are taken from the environment, after
    /// loading `agent.env_file` if it exists.
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path))?;
            Self::parse(&content)?
        } else {
            tracing::debug!(path, "Config file not found, using defaults");
            Config::default()
        };

        if dotenvy::from_filename(&config.agent.env_file).is_ok() {
            tracing::debug!(env_file = %config.agent.env_file, "Loaded env file");
        }
        config.store.apply_env_fallback();
        Ok(config)
    }

    /// Parse configuration text, expanding `${ENV_VAR}` references first
    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)
            .with_context(|| "Failed to parse configuration")?;
        Ok(config)
    }

    /// Reject configurations the loops cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.store.url.trim().is_empty() {
            bail!("store.url is not set (or SUPABASE_URL / NEXT_PUBLIC_SUPABASE_URL)");
        }
        if self.store.api_key.trim().is_empty() {
            bail!("store.api_key is not set (or SUPABASE_KEY / NEXT_PUBLIC_SUPABASE_ANON_KEY)");
        }
        if self.store.request_timeout_secs == 0 {
            bail!("store.request_timeout_secs must be positive");
        }
        if self.store.page_size == 0 {
            bail!("store.page_size must be positive");
        }

        let a = &self.anomaly;
        if a.interval_secs == 0 || a.window_secs == 0 {
            bail!("anomaly.interval_secs and anomaly.window_secs must be positive");
        }
        let periods = [
            ("store.request_timeout_secs", self.store.request_timeout_secs),
            ("anomaly.interval_secs", a.interval_secs),
            ("anomaly.window_secs", a.window_secs),
            ("anomaly.cooldown_secs", a.cooldown_secs),
            ("predictive.interval_secs", self.predictive.interval_secs),
            ("predictive.health_window_hours", u64::from(self.predictive.health_window_hours) * 3600),
        ];
        for (name, secs) in periods {
            if secs > MAX_PERIOD_SECS {
                bail!("{} exceeds the maximum of {} seconds", name, MAX_PERIOD_SECS);
            }
        }
        if a.spike_sensitivity <= 0.0 {
            bail!("anomaly.spike_sensitivity must be positive");
        }
        if a.sigma_factor <= 0.0 {
            bail!("anomaly.sigma_factor must be positive");
        }
        if a.sigma_min_points < 2 {
            bail!("anomaly.sigma_min_points must be at least 2");
        }

        for metric in MetricId::TRACKED {
            let b = self.thresholds.for_metric(metric);
            if b.warning > b.critical {
                bail!("thresholds.{}: warning ({}) exceeds critical ({})", metric, b.warning, b.critical);
            }
        }

        let p = &self.predictive;
        if p.interval_secs == 0 || p.health_window_hours == 0 {
            bail!("predictive.interval_secs and predictive.health_window_hours must be positive");
        }
        if p.rul_min_points < 2 {
            bail!("predictive.rul_min_points must be at least 2");
        }
        let w = &p.weights;
        if w.temp_stability < 0.0 || w.noise_level < 0.0 || w.pixel_growth < 0.0 {
            bail!("predictive.weights must not be negative");
        }
        let ranges = [
            ("temp_std", p.bounds.temp_std),
            ("noise_level", p.bounds.noise_level),
            ("pixel_growth", p.bounds.pixel_growth),
        ];
        for (name, (min, max)) in ranges {
            if max <= min {
                bail!("predictive.bounds.{}: max ({}) must exceed min ({})", name, max, min);
            }
        }

        Ok(())
    }
}

impl StoreConfig {
    fn apply_env_fallback(&mut self) {
        if self.url.trim().is_empty() {
            if let Some(url) = first_env(&["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"]) {
                self.url = url;
            }
        }
        if self.api_key.trim().is_empty() {
            if let Some(key) = first_env(&["SUPABASE_KEY", "NEXT_PUBLIC_SUPABASE_ANON_KEY"]) {
                self.api_key = key;
            }
        }
    }
}

/// Seconds as a chrono duration, clamped to the validated maximum
fn seconds(secs: u64) -> Duration {
    Duration::try_seconds(secs.min(MAX_PERIOD_SECS) as i64).unwrap_or_else(Duration::zero)
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|n| std::env::var(n).ok())
        .find(|v| !v.trim().is_empty())
}

/// Expand ${ENV_VAR} references in config string
fn expand_env_vars(input: &str) -> Result<String> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")?;
    let expanded = re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_default()
    });
    Ok(expanded.to_string())
}

// Default value functions
fn default_log_level() -> String { "info".to_string() }
fn default_env_file() -> String { ".env.local".to_string() }
fn default_request_timeout() -> u64 { 10 }
fn default_page_size() -> usize { 1000 }
fn default_readings_table() -> String { "sensor_health_logs".to_string() }
fn default_alerts_table() -> String { "sensor_alerts".to_string() }
fn default_predictions_table() -> String { "sensor_predictions".to_string() }
fn default_devices_table() -> String { "sensor_devices".to_string() }
fn default_true() -> bool { true }
fn default_anomaly_interval() -> u64 { 10 }
fn default_anomaly_window() -> u64 { 3600 }
fn default_cooldown() -> u64 { 300 }
fn default_spike_sensitivity() -> f64 { 1.5 }
fn default_sigma_factor() -> f64 { 3.0 }
fn default_sigma_min_points() -> usize { 11 }
fn default_temperature_bounds() -> Bounds { Bounds { warning: 45.0, critical: 60.0 } }
fn default_noise_bounds() -> Bounds { Bounds { warning: 2.5, critical: 5.0 } }
fn default_pixel_bounds() -> Bounds { Bounds { warning: 20.0, critical: 50.0 } }
fn default_predictive_interval() -> u64 { 3600 }
fn default_device_id() -> i64 { 1 }
fn default_health_window() -> u32 { 24 }
fn default_noise_critical() -> f64 { 5.0 }
fn default_rul_min_points() -> usize { 10 }
fn default_weight_temp() -> f64 { 0.3 }
fn default_weight_noise() -> f64 { 0.5 }
fn default_weight_pixel() -> f64 { 0.2 }
fn default_temp_std_range() -> (f64, f64) { (0.0, 2.0) }
fn default_noise_range() -> (f64, f64) { (0.5, 5.0) }
fn default_pixel_growth_range() -> (f64, f64) { (0.0, 5.0) }
