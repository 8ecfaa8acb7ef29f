//! Position fix model.
//!
//! A [`Fix`] is a single position observation reported by one of the three
//! positioning sources. Fixes are immutable: the only "mutation" the engine
//! performs is stamping the elapsed request time onto a finalized fix, which
//! produces a new value.
//!
//! # Time
//!
//! Fix timestamps are [`FixTime`] values - milliseconds on a clock shared by
//! the platform and the engine (see [`crate::clock`]). Age is always derived
//! at use time (`now - timestamp`) and never stored.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Positioning source that produced a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixSource {
    /// High-precision satellite positioning (GPS-like).
    Precise,
    /// Network-assisted positioning (cell towers, Wi-Fi).
    Network,
    /// Opportunistic fixes requested by other clients; no active sensor use.
    Passive,
}

impl FixSource {
    /// All sources in preference order.
    pub const ALL: [FixSource; 3] = [FixSource::Precise, FixSource::Network, FixSource::Passive];

    /// Short lowercase name used in logs and the CLI.
    pub fn name(&self) -> &'static str {
        match self {
            FixSource::Precise => "precise",
            FixSource::Network => "network",
            FixSource::Passive => "passive",
        }
    }
}

impl fmt::Display for FixSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Observation timestamp in milliseconds.
///
/// Values are only meaningful relative to other values from the same clock.
/// Signed so that differences between two timestamps are cheap to express.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FixTime(pub i64);

impl FixTime {
    /// Create a timestamp from milliseconds.
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Milliseconds value.
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Signed difference `self - earlier` in milliseconds.
    pub fn delta_millis(&self, earlier: FixTime) -> i64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Time elapsed from `earlier` to `self`, clamped at zero.
    pub fn since(&self, earlier: FixTime) -> Duration {
        let delta = self.delta_millis(earlier);
        Duration::from_millis(delta.max(0) as u64)
    }

    /// Timestamp shifted forward by `duration`.
    pub fn plus(&self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration_millis(duration)))
    }

    /// Timestamp shifted backward by `duration`.
    pub fn minus(&self, duration: Duration) -> Self {
        Self(self.0.saturating_sub(duration_millis(duration)))
    }
}

fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// A single position observation.
///
/// # Example
///
/// ```
/// use fixfinder::fix::{Fix, FixSource, FixTime};
///
/// let fix = Fix::new(53.55, 9.99, 12.0, FixSource::Precise, FixTime::from_millis(1_000));
/// assert_eq!(fix.source(), FixSource::Precise);
/// assert!(fix.request_duration().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    latitude: f64,
    longitude: f64,
    accuracy: f64,
    source: FixSource,
    timestamp: FixTime,
    /// Elapsed time from request start to finalization (set on finalized fixes only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_duration: Option<Duration>,
}

impl Fix {
    /// Create a new fix.
    ///
    /// `accuracy` is the estimated horizontal error radius in meters.
    pub fn new(
        latitude: f64,
        longitude: f64,
        accuracy: f64,
        source: FixSource,
        timestamp: FixTime,
    ) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            source,
            timestamp,
            request_duration: None,
        }
    }

    /// Latitude in degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Accuracy in meters (lower is better).
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    /// Source that produced this fix.
    pub fn source(&self) -> FixSource {
        self.source
    }

    /// Observation timestamp.
    pub fn timestamp(&self) -> FixTime {
        self.timestamp
    }

    /// Position as `(latitude, longitude)`.
    pub fn position(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    /// Age of this fix relative to `now` (zero for fixes from the future).
    pub fn age(&self, now: FixTime) -> Duration {
        now.since(self.timestamp)
    }

    /// Time from request start until this fix was delivered, if finalized.
    pub fn request_duration(&self) -> Option<Duration> {
        self.request_duration
    }

    /// Copy of this fix stamped with the elapsed request time.
    pub fn with_request_duration(&self, elapsed: Duration) -> Self {
        Self {
            request_duration: Some(elapsed),
            ..self.clone()
        }
    }
}

impl fmt::Display for Fix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.6}, {:.6} (±{:.1}m, {})",
            self.latitude, self.longitude, self.accuracy, self.source
        )
    }
}
