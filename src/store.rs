//! Append-only sample persistence with retention cleanup.
//!
//! The store keeps every sample in memory and mirrors it to a JSON-lines
//! file (one serialized [`Sample`] per line), so a process restart replays
//! the full history. One mutex guards both, which makes `append` and
//! `cleanup` atomic with respect to `recent`/`all_for_range` readers: a
//! reader can never observe a half-finished retention sweep.
//!
//! The store enforces nothing about timestamp ordering: the collector polls
//! on a timer so timestamps are non-decreasing in practice, but duplicates
//! and out-of-order rows (e.g. a historical backfill after downtime) are
//! accepted and every query sorts before returning.
//!
//! # Example
//!
//! ```
//! use saunamon::{Sample, SampleStore};
//! use chrono::Duration;
//!
//! let store = SampleStore::in_memory();
//! store.append(Sample::now(48.5, 20.0))?;
//!
//! let window = store.recent(Duration::minutes(15));
//! assert_eq!(window.len(), 1);
//! # Ok::<(), saunamon::Error>(())
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};

use crate::error::Error;
use crate::sample::Sample;

/// Durable append-only log of sensor samples.
///
/// Open one per appliance with [`SampleStore::open`], or use
/// [`SampleStore::in_memory`] for tests and simulations. All methods take
/// `&self`; the store is safe to share behind an `Arc` between the tick
/// loop (single writer) and any concurrent reader.
pub struct SampleStore {
    inner: Mutex<Inner>,
}

struct Inner {
    /// Samples in insertion order; queries sort by timestamp on the way out.
    samples: Vec<Sample>,
    /// Backing file, `None` for an in-memory store.
    path: Option<PathBuf>,
}

impl SampleStore {
    /// Open a store backed by the JSON-lines file at `path`, creating it
    /// if it does not exist yet.
    ///
    /// Lines that fail to parse (truncated write, manual edit) are skipped
    /// with a warning rather than failing the whole load; losing one row
    /// beats refusing to start the appliance.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let mut samples = Vec::new();

        if path.exists() {
            let file = File::open(&path)?;
            for (lineno, line) in BufReader::new(file).lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Sample>(&line) {
                    Ok(sample) => samples.push(sample),
                    Err(e) => {
                        tracing::warn!(
                            "Skipping unreadable sample at {}:{}: {}",
                            path.display(),
                            lineno + 1,
                            e
                        );
                    }
                }
            }
            tracing::info!("Loaded {} samples from {}", samples.len(), path.display());
        }

        Ok(Self {
            inner: Mutex::new(Inner {
                samples,
                path: Some(path),
            }),
        })
    }

    /// Create a store with no backing file.
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(Inner {
                samples: Vec::new(),
                path: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one sample to the log.
    ///
    /// Rejects non-finite readings (they would serialize to JSON `null` and
    /// poison the log); the collector sees the [`Error::InvalidSample`] and
    /// moves on. An I/O failure is reported to the caller and the sample is
    /// dropped entirely: a missed row is acceptable loss, a memory/disk
    /// mismatch is not.
    pub fn append(&self, sample: Sample) -> Result<(), Error> {
        sample.validate()?;
        let mut inner = self.lock();

        if let Some(path) = &inner.path {
            let line = serde_json::to_string(&sample)?;
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            writeln!(file, "{}", line)?;
        }

        inner.samples.push(sample);
        Ok(())
    }

    /// Samples from the trailing `window`, ascending by timestamp.
    ///
    /// Returns an empty vec when no samples fall in the window (a valid
    /// start-up state, not an error).
    pub fn recent(&self, window: Duration) -> Vec<Sample> {
        self.recent_at(Utc::now(), window)
    }

    /// Like [`recent`](Self::recent) with an explicit `now`, for
    /// deterministic tests and replays.
    pub fn recent_at(&self, now: DateTime<Utc>, window: Duration) -> Vec<Sample> {
        let cutoff = now - window;
        let inner = self.lock();
        let mut result: Vec<Sample> = inner
            .samples
            .iter()
            .filter(|s| s.timestamp >= cutoff)
            .cloned()
            .collect();
        result.sort_by_key(|s| s.timestamp);
        result
    }

    /// Samples with `start <= timestamp < end`, ascending by timestamp.
    ///
    /// This is the graphing query: the renderer asks for the plot window
    /// it is about to draw.
    pub fn all_for_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Sample> {
        let inner = self.lock();
        let mut result: Vec<Sample> = inner
            .samples
            .iter()
            .filter(|s| s.timestamp >= start && s.timestamp < end)
            .cloned()
            .collect();
        result.sort_by_key(|s| s.timestamp);
        result
    }

    /// The newest sample, for the gauge.
    pub fn latest(&self) -> Option<Sample> {
        let inner = self.lock();
        inner.samples.iter().max_by_key(|s| s.timestamp).cloned()
    }

    /// Whether the newest sample is younger than `max_age`.
    ///
    /// Drives the start-up decision to backfill from the sensor's on-board
    /// history: stale or absent data means the appliance was off while the
    /// sauna may have been heating.
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        self.is_fresh_at(Utc::now(), max_age)
    }

    /// Like [`is_fresh`](Self::is_fresh) with an explicit `now`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.latest()
            .map(|s| s.age(now) <= max_age)
            .unwrap_or(false)
    }

    /// Delete samples older than `retention_horizon` and compact the
    /// backing file. Returns how many rows were removed.
    ///
    /// Idempotent: a second sweep with the same horizon removes nothing.
    /// The retention horizon must be configured longer than the trend
    /// window; the sweep itself does not know about the estimator.
    pub fn cleanup(&self, retention_horizon: Duration) -> Result<usize, Error> {
        self.cleanup_at(Utc::now(), retention_horizon)
    }

    /// Like [`cleanup`](Self::cleanup) with an explicit `now`.
    pub fn cleanup_at(
        &self,
        now: DateTime<Utc>,
        retention_horizon: Duration,
    ) -> Result<usize, Error> {
        let cutoff = now - retention_horizon;
        let mut inner = self.lock();

        let before = inner.samples.len();
        inner.samples.retain(|s| s.timestamp >= cutoff);
        let removed = before - inner.samples.len();

        // Rewrite the file only when the sweep actually removed something.
        if removed > 0 {
            if let Some(path) = inner.path.clone() {
                rewrite(&path, &inner.samples)?;
            }
            tracing::debug!("Retention sweep removed {} samples", removed);
        }

        Ok(removed)
    }

    /// Number of stored samples.
    pub fn len(&self) -> usize {
        self.lock().samples.len()
    }

    /// Whether the store holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Replace the backing file with the surviving samples.
///
/// Writes a sibling temp file and renames it over the original, so a crash
/// mid-sweep leaves either the old log or the new one, never a truncation.
fn rewrite(path: &Path, samples: &[Sample]) -> Result<(), Error> {
    let tmp = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp)?;
        for sample in samples {
            let line = serde_json::to_string(sample)?;
            writeln!(file, "{}", line)?;
        }
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
