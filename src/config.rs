//! Appliance configuration.
//!
//! Everything that used to be an ambient global (sensor MAC, target
//! temperature, thresholds, retention horizon) lives in one explicit
//! [`MonitorConfig`] struct that is handed to the store, estimator, and
//! tick loop at construction.
//!
//! # Example config (YAML)
//!
//! ```yaml
//! sensor_mac: "AA:BB:CC:DD:EE:FF"
//! db_path: "sauna_data.jsonl"
//! target_temp: 65
//! min_active_temp: 40
//! drop_threshold: 5
//! trend_window_secs: 900      # 15 minutes
//! retention_days: 10
//! update_interval_secs: 60
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::Deserialize;

use crate::error::Error;
use crate::trend::TrendConfig;

/// Full appliance configuration, YAML-loadable.
///
/// Any field left out of the file takes its default, so a minimal config
/// can be just the sensor MAC and a target temperature.
///
/// One contract is documented rather than enforced: the retention horizon
/// must exceed the trend window, or the sweep could starve the estimator.
/// The defaults keep days between them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// MAC address of the Bluetooth environmental sensor
    pub sensor_mac: String,

    /// Path of the JSON-lines sample log
    pub db_path: PathBuf,

    /// Target temperature in °C
    pub target_temp: f64,

    /// Below this the sauna counts as cold, in °C
    pub min_active_temp: f64,

    /// In-window drop that raises the significant-drop flag, in °C
    pub drop_threshold: f64,

    /// Endpoint delta below which the trend counts as flat, in °C
    pub stable_band: f64,

    /// Trailing window the estimator looks at, in seconds
    pub trend_window_secs: u64,

    /// Trailing window the dashboard graph plots, in seconds
    pub graph_window_secs: u64,

    /// How many days of history the retention sweep keeps
    pub retention_days: u64,

    /// Seconds between ticks of the monitor loop
    pub update_interval_secs: u64,

    /// Seconds between retention sweeps
    pub cleanup_interval_secs: u64,

    /// Upper bound on one sensor poll, in seconds
    pub poll_timeout_secs: u64,

    /// Maximum age of the newest sample before the stored history counts
    /// as stale and a backfill is worthwhile, in seconds
    pub freshness_max_age_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sensor_mac: String::new(),
            db_path: PathBuf::from("sauna_data.jsonl"),
            target_temp: 65.0,
            min_active_temp: 40.0,
            drop_threshold: 5.0,
            stable_band: 1.0,
            trend_window_secs: 15 * 60,
            graph_window_secs: 2 * 60 * 60,
            retention_days: 10,
            update_interval_secs: 60,
            cleanup_interval_secs: 24 * 60 * 60,
            poll_timeout_secs: 10,
            freshness_max_age_secs: 2 * 60 * 60,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Config(format!("Invalid config YAML: {}", e)))
    }

    /// Load configuration, falling back to defaults on any failure.
    ///
    /// An unreadable or invalid file is logged as a warning, not a crash:
    /// the appliance still comes up with stock settings.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => {
                tracing::info!(
                    "Loaded config from {}: target {}°C, window {}s",
                    path.as_ref().display(),
                    config.target_temp,
                    config.trend_window_secs
                );
                config
            }
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// The estimator's view of this configuration.
    pub fn trend(&self) -> TrendConfig {
        TrendConfig {
            target_temp: self.target_temp,
            min_active_temp: self.min_active_temp,
            drop_threshold: self.drop_threshold,
            stable_band: self.stable_band,
        }
    }

    /// Trailing window for trend estimation.
    pub fn trend_window(&self) -> Duration {
        Duration::seconds(self.trend_window_secs as i64)
    }

    /// Trailing window plotted on the dashboard graph.
    pub fn graph_window(&self) -> Duration {
        Duration::seconds(self.graph_window_secs as i64)
    }

    /// Maximum sample age before the retention sweep deletes it.
    pub fn retention_horizon(&self) -> Duration {
        Duration::days(self.retention_days as i64)
    }

    /// Maximum age of the newest sample before history counts as stale.
    pub fn freshness_max_age(&self) -> Duration {
        Duration::seconds(self.freshness_max_age_secs as i64)
    }

    /// Period of the monitor tick loop.
    pub fn update_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.update_interval_secs)
    }

    /// How often the retention sweep runs.
    pub fn cleanup_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.cleanup_interval_secs)
    }

    /// Bound on one sensor poll.
    pub fn poll_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.poll_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.target_temp, 65.0);
        assert_eq!(config.trend_window(), Duration::minutes(15));
        assert_eq!(config.retention_horizon(), Duration::days(10));
        assert_eq!(config.graph_window(), Duration::hours(2));
        assert_eq!(config.freshness_max_age(), Duration::hours(2));
        assert_eq!(config.cleanup_interval(), StdDuration::from_secs(86400));
        assert_eq!(config.poll_timeout(), StdDuration::from_secs(10));
        assert!(config.retention_horizon() > config.trend_window());
    }

    #[test]
    fn test_from_yaml_full() {
        let yaml = r#"
sensor_mac: "C4:64:E3:0A:0B:0C"
db_path: "/var/lib/saunamon/samples.jsonl"
target_temp: 80
min_active_temp: 35
drop_threshold: 8
trend_window_secs: 600
retention_days: 7
update_interval_secs: 30
"#;
        let config = MonitorConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.sensor_mac, "C4:64:E3:0A:0B:0C");
        assert_eq!(config.target_temp, 80.0);
        assert_eq!(config.trend_window(), Duration::minutes(10));
        assert_eq!(config.retention_horizon(), Duration::days(7));
        assert_eq!(config.update_interval(), StdDuration::from_secs(30));
    }

    #[test]
    fn test_from_yaml_partial_uses_defaults() {
        let yaml = r#"
sensor_mac: "C4:64:E3:0A:0B:0C"
target_temp: 70
"#;
        let config = MonitorConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.target_temp, 70.0);
        assert_eq!(config.min_active_temp, 40.0);
        assert_eq!(config.retention_days, 10);
    }

    #[test]
    fn test_from_yaml_invalid() {
        let err = MonitorConfig::from_yaml("target_temp: [not, a, number]");
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = MonitorConfig::load_or_default("/nonexistent/saunamon.yaml");
        assert_eq!(config.target_temp, 65.0);
    }

    #[test]
    fn test_trend_view() {
        let config = MonitorConfig {
            target_temp: 75.0,
            drop_threshold: 12.0,
            ..Default::default()
        };
        let trend = config.trend();
        assert_eq!(trend.target_temp, 75.0);
        assert_eq!(trend.drop_threshold, 12.0);
        assert_eq!(trend.stable_band, 1.0);
    }
}
