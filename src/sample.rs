//! The sample data model.
//!
//! A [`Sample`] is one timestamped sensor reading. Samples are append-only:
//! the collector creates them, the store persists them, and only the
//! retention sweep ever removes them. A sample is never mutated in place.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One temperature/humidity reading from the sauna sensor.
///
/// Timestamps are non-decreasing in practice (the collector polls on a
/// timer) but this is not enforced: out-of-order or duplicate timestamps
/// are stored as-is and tolerated by every query. Humidity is nominally
/// 0–100 %RH; out-of-range values are the collector's problem and are
/// stored unmodified.
///
/// # Example
///
/// ```
/// use saunamon::Sample;
/// use chrono::{TimeZone, Utc};
///
/// let sample = Sample::new(
///     Utc.with_ymd_and_hms(2024, 1, 6, 18, 30, 0).unwrap(),
///     72.5,
///     14.0,
/// );
/// assert_eq!(sample.temperature, 72.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// When the reading was taken
    pub timestamp: DateTime<Utc>,

    /// Temperature in °C
    pub temperature: f64,

    /// Relative humidity in percent
    pub humidity: f64,
}

impl Sample {
    /// Create a sample with an explicit timestamp.
    pub fn new(timestamp: DateTime<Utc>, temperature: f64, humidity: f64) -> Self {
        Self {
            timestamp,
            temperature,
            humidity,
        }
    }

    /// Create a sample stamped with the current time.
    pub fn now(temperature: f64, humidity: f64) -> Self {
        Self::new(Utc::now(), temperature, humidity)
    }

    /// Check that both readings are finite numbers.
    ///
    /// Non-finite floats serialize to JSON `null` and would poison the
    /// persisted log, so the store rejects them at the door.
    pub fn validate(&self) -> Result<(), Error> {
        if self.temperature.is_finite() && self.humidity.is_finite() {
            Ok(())
        } else {
            Err(Error::InvalidSample {
                temperature: self.temperature,
                humidity: self.humidity,
            })
        }
    }

    /// Age of this sample relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_validate_finite() {
        assert!(Sample::new(ts(0), 80.0, 12.0).validate().is_ok());
        assert!(Sample::new(ts(0), -40.0, 0.0).validate().is_ok());
        // Out of natural range is still valid at this layer
        assert!(Sample::new(ts(0), 80.0, 120.0).validate().is_ok());
    }

    #[test]
    fn test_validate_non_finite() {
        assert!(Sample::new(ts(0), f64::NAN, 12.0).validate().is_err());
        assert!(Sample::new(ts(0), 80.0, f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_age() {
        let sample = Sample::new(ts(0), 80.0, 12.0);
        assert_eq!(sample.age(ts(90)), Duration::seconds(90));
    }

    #[test]
    fn test_json_round_trip() {
        let sample = Sample::new(ts(42), 63.25, 18.5);
        let json = serde_json::to_string(&sample).unwrap();
        let back: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);
    }
}
