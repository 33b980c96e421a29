//! Timestamp handling.
//!
//! Defines the Timestamp type (milliseconds since Unix epoch) used for
//! entry attributes and listing freshness.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Timestamp in milliseconds since Unix epoch.
///
/// Used throughout strata for:
/// - Entry modification, change and creation times
/// - The moment a listing snapshot was fetched
/// - Stream buffer freshness
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// The Unix epoch, used as "never updated".
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Creates a new timestamp from milliseconds since Unix epoch.
    pub const fn new(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the current time as a timestamp.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("System time before Unix epoch");
        Self(duration.as_millis() as i64)
    }

    /// Returns the milliseconds since Unix epoch.
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Returns true if this timestamp is after the other.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Returns the later of two optional timestamps.
    pub fn latest(a: Option<Timestamp>, b: Option<Timestamp>) -> Option<Timestamp> {
        match (a, b) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, None) => a,
            (None, b) => b,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

impl From<i64> for Timestamp {
    fn from(millis: i64) -> Self {
        Self(millis)
    }
}

impl From<Timestamp> for i64 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}
