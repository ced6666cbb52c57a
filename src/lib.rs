//! # saunamon
//!
//! Core library for a single-sauna monitoring appliance.
//!
//! A Bluetooth environmental sensor inside the sauna is polled once a
//! minute; readings are persisted, a trend estimate projects the time to
//! target temperature, and a dashboard (gauge, graph, text) goes out to a
//! low-refresh e-ink panel. This crate owns the middle of that pipeline:
//!
//! | Component | Role |
//! |-----------|------|
//! | [`SampleStore`] | append-only persisted sample log with retention cleanup |
//! | [`estimate`] | pure trend estimation: rate, ETA, drop detection |
//! | [`MonitorConfig`] | explicit YAML-loadable configuration |
//! | `Monitor` | the tick loop (feature `monitor`) |
//!
//! The sensor radio and the display hardware stay outside, behind the
//! `Collector` and `Renderer` traits: data flows
//! collector → store → estimator → renderer, driven by one periodic tick.
//!
//! ## Quick start
//!
//! ```
//! use saunamon::{estimate, Sample, SampleStore, TrendConfig};
//! use chrono::Duration;
//!
//! let store = SampleStore::in_memory();
//! store.append(Sample::now(52.0, 18.0))?;
//!
//! let window = store.recent(Duration::minutes(15));
//! let trend = estimate(&window, &TrendConfig::default());
//! println!("{:?}: {:.4} °C/s", trend.status, trend.rate_of_change);
//! # Ok::<(), saunamon::Error>(())
//! ```
//!
//! ## Failure philosophy
//!
//! The appliance must keep drawing whatever it knows. Storage failures are
//! reported and retried next tick, a stalled sensor poll is abandoned on a
//! timeout, and "not enough data yet" is a first-class estimate state, not
//! an error. Nothing inside a tick can take the process down.
//!
//! ## Feature flags
//!
//! - `monitor` - The async tick loop (`Monitor`, `Collector`, `Renderer`),
//!   pulls in tokio
//! - `full` - All features

pub mod config;
mod error;
mod sample;
mod store;
mod trend;

pub use config::MonitorConfig;
pub use error::Error;
pub use sample::Sample;
pub use store::SampleStore;
pub use trend::{estimate, status_message, SaunaStatus, TrendConfig, TrendEstimate};

/// Dashboard panel width in pixels (Waveshare 7.5" e-ink)
pub const DISPLAY_WIDTH: u32 = 800;

/// Dashboard panel height in pixels
pub const DISPLAY_HEIGHT: u32 = 480;

// Optional modules
#[cfg(feature = "monitor")]
pub mod monitor;
#[cfg(feature = "monitor")]
pub use monitor::{Collector, DashboardView, Monitor, Renderer};

/// Convert a trend rate from °C per second to °C per hour.
///
/// The estimator works in seconds; dashboards and log lines read better
/// in °C/h.
///
/// # Example
///
/// ```
/// use saunamon::rate_per_hour;
///
/// assert_eq!(rate_per_hour(0.01), 36.0);
/// ```
pub fn rate_per_hour(rate_per_sec: f64) -> f64 {
    rate_per_sec * 3600.0
}
