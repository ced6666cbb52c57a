//! Trend estimation: rate of change, time-to-target, drop detection.
//!
//! [`estimate`] is a pure function of (recent samples, config) with no
//! internal state; the tick loop recomputes it from scratch every cycle.
//! Every input shape maps to a defined output: zero samples, one sample,
//! a flat plateau, and a falling trend are all valid states, never errors.

use serde::Serialize;

use crate::sample::Sample;

/// Tuning knobs for the estimator.
///
/// Defaults match a typical wood-fired sauna: 65 °C target, 40 °C
/// "someone lit the stove" floor, 5 °C drop alarm, 1 °C stable band.
#[derive(Debug, Clone)]
pub struct TrendConfig {
    /// Temperature we are heating towards, in °C
    pub target_temp: f64,
    /// Below this the sauna counts as cold/off, in °C
    pub min_active_temp: f64,
    /// Drop within the window that raises the significant-drop flag, in °C
    pub drop_threshold: f64,
    /// Endpoint delta below which the trend counts as flat, in °C
    pub stable_band: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            target_temp: 65.0,
            min_active_temp: 40.0,
            drop_threshold: 5.0,
            stable_band: 1.0,
        }
    }
}

/// Coarse classification of what the sauna is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SaunaStatus {
    /// Fewer than two samples in the window; nothing to extrapolate from
    InsufficientData,
    /// Below the minimum active temperature
    Cold,
    /// At or above the target temperature
    Ready,
    /// Temperature holding within the stable band
    Stable,
    /// Temperature rising; an ETA is available
    Heating,
    /// Temperature falling
    Cooling,
}

impl SaunaStatus {
    /// Whether the stove appears to be lit.
    pub fn is_active(self) -> bool {
        !matches!(self, SaunaStatus::InsufficientData | SaunaStatus::Cold)
    }
}

/// Result of one estimation pass. Derived, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct TrendEstimate {
    /// Temperature slope over the window, in °C per second
    pub rate_of_change: f64,

    /// Projected seconds until the target temperature.
    ///
    /// `None` whenever the projection is meaningless: cooling or flat
    /// trend, target already reached, or insufficient samples. Never
    /// negative, never a division by zero.
    pub seconds_to_target: Option<f64>,

    /// A sharp in-window drop (door opened, stove died), independent of
    /// the overall trend direction
    pub significant_drop: bool,

    /// Classification the renderer builds its headline from
    pub status: SaunaStatus,
}

impl TrendEstimate {
    fn insufficient() -> Self {
        Self {
            rate_of_change: 0.0,
            seconds_to_target: None,
            significant_drop: false,
            status: SaunaStatus::InsufficientData,
        }
    }

    /// ETA rounded down to whole minutes, for display.
    pub fn minutes_to_target(&self) -> Option<u64> {
        self.seconds_to_target.map(|s| (s / 60.0) as u64)
    }
}

/// Estimate the temperature trend from a window of samples.
///
/// The slope is the endpoint difference divided by the elapsed span, so
/// doubling the span with the same delta halves the reported rate. The
/// samples are those returned by
/// [`SampleStore::recent`](crate::SampleStore::recent); the function sorts
/// out its own endpoints, so ordering is not load-bearing.
///
/// # Example
///
/// ```
/// use saunamon::{estimate, Sample, TrendConfig};
/// use chrono::{TimeZone, Utc};
///
/// let t0 = Utc.with_ymd_and_hms(2024, 1, 6, 18, 0, 0).unwrap();
/// let samples = vec![
///     Sample::new(t0, 50.0, 15.0),
///     Sample::new(t0 + chrono::Duration::minutes(10), 56.0, 14.0),
/// ];
/// let estimate = estimate(&samples, &TrendConfig::default());
/// assert!(estimate.rate_of_change > 0.0);
/// assert!(estimate.seconds_to_target.is_some());
/// ```
pub fn estimate(samples: &[Sample], config: &TrendConfig) -> TrendEstimate {
    if samples.len() < 2 {
        return TrendEstimate::insufficient();
    }

    // Endpoints by timestamp, not by position; backfills may interleave.
    let (Some(first), Some(last)) = (
        samples.iter().min_by_key(|s| s.timestamp),
        samples.iter().max_by_key(|s| s.timestamp),
    ) else {
        return TrendEstimate::insufficient();
    };

    let elapsed = (last.timestamp - first.timestamp).num_milliseconds() as f64 / 1000.0;
    let delta = last.temperature - first.temperature;
    let rate = if elapsed > 0.0 { delta / elapsed } else { 0.0 };

    let current = last.temperature;
    let max_temp = samples
        .iter()
        .map(|s| s.temperature)
        .fold(f64::NEG_INFINITY, f64::max);
    let significant_drop = max_temp - current > config.drop_threshold;

    let (status, seconds_to_target) = if current < config.min_active_temp {
        (SaunaStatus::Cold, None)
    } else if current >= config.target_temp {
        (SaunaStatus::Ready, None)
    } else if delta.abs() < config.stable_band || rate == 0.0 {
        (SaunaStatus::Stable, None)
    } else if rate > 0.0 {
        let eta = (config.target_temp - current) / rate;
        (SaunaStatus::Heating, Some(eta))
    } else {
        (SaunaStatus::Cooling, None)
    };

    TrendEstimate {
        rate_of_change: rate,
        seconds_to_target,
        significant_drop,
        status,
    }
}

/// Headline and detail line for the dashboard's text panel.
///
/// A significant drop takes priority over the trend classification: a
/// door-opening event makes the slope ambiguous but the message is still
/// clear.
pub fn status_message(estimate: &TrendEstimate, config: &TrendConfig) -> (String, String) {
    if estimate.significant_drop {
        return ("Temperature dropping".into(), "Add wood to stove".into());
    }

    match estimate.status {
        SaunaStatus::InsufficientData => ("Collecting data".into(), "Please wait...".into()),
        SaunaStatus::Cold => ("Sauna is cold".into(), "Turn on to heat".into()),
        SaunaStatus::Ready => ("Sauna is ready!".into(), "Enjoy your sauna".into()),
        SaunaStatus::Stable => ("Temp stable".into(), "Add wood to increase".into()),
        SaunaStatus::Cooling => ("Temp dropping".into(), "Add wood if needed".into()),
        SaunaStatus::Heating => {
            let minutes = estimate.minutes_to_target().unwrap_or(0);
            let detail = if minutes > 60 {
                format!(
                    "{}h {}min to {:.0}°C",
                    minutes / 60,
                    minutes % 60,
                    config.target_temp
                )
            } else {
                format!("{} min to {:.0}°C", minutes, config.target_temp)
            };
            ("Heating".into(), detail)
        }
    }
}
