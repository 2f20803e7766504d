//! Wall-clock timestamps that never run backwards within a run.
//!
//! Snapshots are stamped from a wall-clock anchor taken once at start plus the
//! monotonic time elapsed since then, so an NTP step or manual clock change
//! mid-run cannot reorder the history. Each issued stamp is also strictly
//! greater than the previous one.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Current wall-clock time, without any monotonic guarantee.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    pub fn from_system_time(t: SystemTime) -> Self {
        Self(t.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64)
    }

    pub fn as_millis(self) -> u64 {
        self.0
    }

    /// Signed seconds from `earlier` to `self`.
    pub fn seconds_since(self, earlier: Timestamp) -> f64 {
        (self.0 as f64 - earlier.0 as f64) / 1000.0
    }

    /// `2026-02-15T01:30:00Z`
    pub fn to_iso8601(self) -> String {
        let (year, month, day, hour, min, sec) = secs_to_utc(self.0 / 1000);
        format!("{year:04}-{month:02}-{day:02}T{hour:02}:{min:02}:{sec:02}Z")
    }

    /// `20260215_013000`, used in artifact file names.
    pub fn to_compact(self) -> String {
        let (year, month, day, hour, min, sec) = secs_to_utc(self.0 / 1000);
        format!("{year:04}{month:02}{day:02}_{hour:02}{min:02}{sec:02}")
    }

    /// `01:30:00` (UTC).
    pub fn to_clock_time(self) -> String {
        let (_, _, _, hour, min, sec) = secs_to_utc(self.0 / 1000);
        format!("{hour:02}:{min:02}:{sec:02}")
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

/// Issues strictly increasing wall-clock timestamps.
#[derive(Debug)]
pub struct MonotonicClock {
    anchor_wall: Timestamp,
    anchor_instant: Instant,
    last: Option<Timestamp>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            anchor_wall: Timestamp::now(),
            anchor_instant: Instant::now(),
            last: None,
        }
    }

    /// Next timestamp: anchor + elapsed, bumped past the previous stamp if
    /// two calls land in the same millisecond.
    pub fn now(&mut self) -> Timestamp {
        let elapsed = self.anchor_instant.elapsed();
        let mut ts = Timestamp(self.anchor_wall.0 + elapsed.as_millis() as u64);
        if let Some(last) = self.last
            && ts <= last
        {
            ts = Timestamp(last.0 + 1);
        }
        self.last = Some(ts);
        ts
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Split Unix seconds into UTC `(year, month, day, hour, minute, second)`.
/// Leap seconds are ignored.
fn secs_to_utc(secs: u64) -> (u64, u64, u64, u64, u64, u64) {
    let (days, rem) = (secs / 86_400, secs % 86_400);
    let (year, month, day) = civil_from_days(days);
    (year, month, day, rem / 3600, (rem % 3600) / 60, rem % 60)
}

/// Proleptic Gregorian date for a day count since 1970-01-01, computed in
/// 400-year eras that start on March 1st.
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z % 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = era * 400 + yoe + u64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_strictly_increasing() {
        let mut clock = MonotonicClock::new();
        let mut prev = clock.now();
        for _ in 0..1000 {
            let next = clock.now();
            assert!(next > prev, "{next:?} should follow {prev:?}");
            prev = next;
        }
    }

    #[test]
    fn seconds_since_is_signed() {
        let a = Timestamp(10_000);
        let b = Timestamp(11_500);
        assert!((b.seconds_since(a) - 1.5).abs() < 1e-12);
        assert!((a.seconds_since(b) + 1.5).abs() < 1e-12);
    }

    #[test]
    fn iso8601_epoch() {
        assert_eq!(Timestamp(0).to_iso8601(), "1970-01-01T00:00:00Z");
        assert_eq!(Timestamp(0).to_compact(), "19700101_000000");
    }

    #[test]
    fn known_date_formats() {
        // 2000-01-01 00:00:00 UTC
        let ts = Timestamp(946_684_800_000 + 3_723_000);
        assert_eq!(ts.to_iso8601(), "2000-01-01T01:02:03Z");
        assert_eq!(ts.to_clock_time(), "01:02:03");
        assert_eq!(ts.to_compact(), "20000101_010203");
    }

    #[test]
    fn secs_to_utc_leap_day() {
        // 2024-02-29 12:00:00 UTC
        assert_eq!(secs_to_utc(1_709_208_000), (2024, 2, 29, 12, 0, 0));
    }

    #[test]
    fn civil_dates_around_year_and_century_ends() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        // 1999-12-31, 2000-02-29, 2000-03-01
        assert_eq!(civil_from_days(10_956), (1999, 12, 31));
        assert_eq!(civil_from_days(11_016), (2000, 2, 29));
        assert_eq!(civil_from_days(11_017), (2000, 3, 1));
        // 2100 is not a leap year: 2100-02-28 is followed by 2100-03-01
        assert_eq!(civil_from_days(47_540), (2100, 2, 28));
        assert_eq!(civil_from_days(47_541), (2100, 3, 1));
    }
}
