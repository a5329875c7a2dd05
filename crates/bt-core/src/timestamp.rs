//! Timezone-preserving timestamps.
//!
//! Events are stored in UTC but rendered in the timezone where they occurred.
//! Each [`Timestamp`] captures the originating timezone identifier and its
//! UTC offset at creation time. The offset is never recomputed, so historical
//! events do not shift when the device's timezone changes later.

use chrono::{DateTime, Duration, FixedOffset, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// A UTC instant paired with the timezone it was recorded in.
///
/// Ordering compares the UTC instant first; the timezone fields only break
/// ties so that the ordering stays consistent with equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// The instant in UTC.
    pub utc: DateTime<Utc>,
    /// IANA timezone identifier where the event occurred (e.g., "America/New_York").
    pub timezone_id: String,
    /// Offset from UTC in seconds at the time of the event.
    pub offset_seconds: i32,
}

impl Timestamp {
    /// Creates a timestamp with explicit timezone information.
    pub fn new(utc: DateTime<Utc>, timezone_id: impl Into<String>, offset_seconds: i32) -> Self {
        Self {
            utc,
            timezone_id: timezone_id.into(),
            offset_seconds,
        }
    }

    /// Creates a timestamp pinned to UTC (zero offset).
    pub fn from_utc(utc: DateTime<Utc>) -> Self {
        Self::new(utc, "UTC", 0)
    }

    /// Signed duration from this timestamp to `later`.
    ///
    /// Negative when `later` precedes this timestamp; callers reject negative
    /// durations where their semantics require it.
    pub fn duration_until(&self, later: &Self) -> Duration {
        later.utc - self.utc
    }

    /// Signed duration from this timestamp to the given instant.
    pub fn duration_until_instant(&self, instant: DateTime<Utc>) -> Duration {
        instant - self.utc
    }

    /// The hour of day (0-23) in the originating timezone.
    ///
    /// Falls back to the UTC hour if the recorded offset is out of range
    /// (more than a day), which only happens with corrupt data.
    pub fn local_hour(&self) -> u32 {
        FixedOffset::east_opt(self.offset_seconds).map_or_else(
            || self.utc.hour(),
            |offset| self.utc.with_timezone(&offset).hour(),
        )
    }
}

/// Supplier of the current time, injected so tests control it deterministically.
pub trait Clock {
    /// The current moment, with the device's timezone captured.
    fn now(&self) -> Timestamp;

    /// The current UTC instant, without timezone capture.
    fn instant(&self) -> DateTime<Utc> {
        self.now().utc
    }
}

/// Clock backed by the system time and the device's IANA timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let utc = Utc::now();
        let timezone_id = iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string());
        let offset_seconds = chrono::Local::now().offset().local_minus_utc();
        Timestamp::new(utc, timezone_id, offset_seconds)
    }

    fn instant(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(iso: &str) -> DateTime<Utc> {
        iso.parse().unwrap()
    }

    #[test]
    fn duration_until_is_signed() {
        let a = Timestamp::from_utc(at("2025-06-01T10:00:00Z"));
        let b = Timestamp::from_utc(at("2025-06-01T11:30:00Z"));

        assert_eq!(a.duration_until(&b), Duration::minutes(90));
        assert_eq!(b.duration_until(&a), Duration::minutes(-90));
    }

    #[test]
    fn ordering_puts_earlier_instants_first() {
        let earlier = Timestamp::new(at("2025-06-01T10:00:00Z"), "Asia/Tokyo", 9 * 3600);
        let later = Timestamp::new(at("2025-06-01T10:00:01Z"), "America/New_York", -4 * 3600);

        assert!(earlier < later);
        assert!(later > earlier);
    }

    #[test]
    fn ordering_is_consistent_with_equality() {
        // Same instant, different zones: unequal, so the ordering must not
        // report them as equal either.
        let tokyo = Timestamp::new(at("2025-06-01T10:00:00Z"), "Asia/Tokyo", 9 * 3600);
        let york = Timestamp::new(at("2025-06-01T10:00:00Z"), "America/New_York", -4 * 3600);

        assert_ne!(tokyo, york);
        assert_ne!(
            tokyo.partial_cmp(&york),
            Some(std::cmp::Ordering::Equal),
            "tie-break on timezone fields keeps PartialOrd consistent with PartialEq"
        );
    }

    #[test]
    fn local_hour_applies_recorded_offset() {
        // 02:30 UTC is 21:30 the previous evening in New York (EST, -5h)
        let ts = Timestamp::new(at("2025-01-15T02:30:00Z"), "America/New_York", -5 * 3600);
        assert_eq!(ts.local_hour(), 21);

        let utc = Timestamp::from_utc(at("2025-01-15T02:30:00Z"));
        assert_eq!(utc.local_hour(), 2);
    }

    #[test]
    fn local_hour_falls_back_to_utc_on_bad_offset() {
        let ts = Timestamp::new(at("2025-01-15T08:00:00Z"), "bogus", 999_999);
        assert_eq!(ts.local_hour(), 8);
    }

    #[test]
    fn serde_roundtrip() {
        let ts = Timestamp::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            "Europe/Berlin",
            7200,
        );
        let json = serde_json::to_string(&ts).unwrap();
        let parsed: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ts);
    }
}
