//! Error types for the sauna monitoring core.

use thiserror::Error;

/// Errors that can occur while collecting, storing, or rendering samples.
///
/// Nothing here is fatal to the appliance: every variant is caught at the
/// tick boundary, logged, and retried on the next cycle. Insufficient data
/// for a trend estimate is deliberately *not* an error, see
/// [`SaunaStatus::InsufficientData`](crate::SaunaStatus).
#[derive(Debug, Error)]
pub enum Error {
    /// The persistence layer could not be reached or written
    #[error("storage unavailable: {0}")]
    Storage(String),

    /// A persisted row could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration file is missing, unreadable, or invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// The sensor poll failed or timed out
    #[error("sensor error: {0}")]
    Sensor(String),

    /// The display could not be driven
    #[error("render error: {0}")]
    Render(String),

    /// A sample carried non-finite temperature or humidity values
    #[error("invalid sample: temperature={temperature}, humidity={humidity}")]
    InvalidSample {
        /// Offending temperature value
        temperature: f64,
        /// Offending humidity value
        humidity: f64,
    },
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
