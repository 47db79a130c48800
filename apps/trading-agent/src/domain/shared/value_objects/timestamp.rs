//! UTC timestamp used for order and run bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A UTC instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Wrap an existing `DateTime<Utc>`.
    #[must_use]
    pub const fn new(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Inner `DateTime<Utc>`.
    #[must_use]
    pub const fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_displays_rfc3339() {
        let ts = Timestamp::new(Utc.with_ymd_and_hms(2026, 3, 2, 6, 30, 0).unwrap());
        assert_eq!(format!("{ts}"), "2026-03-02T06:30:00+00:00");
    }

    #[test]
    fn timestamp_converts_both_ways() {
        let dt = Utc.with_ymd_and_hms(2026, 3, 2, 6, 31, 30).unwrap();
        let ts = Timestamp::from(dt);
        assert_eq!(DateTime::<Utc>::from(ts), dt);
        assert!(Timestamp::new(dt - chrono::Duration::seconds(90)) < ts);
    }
}
