//! Conversion between UTC instants and the configured local timezone.
//!
//! # DST policy
//!
//! A local day starts at the earliest instant whose local date is that day:
//! an ambiguous midnight (fall-back) resolves to the earlier offset, and a
//! nonexistent midnight (spring-forward gap) resolves to the first valid local
//! time after it. A local day ends one microsecond before the next one starts,
//! so 23- and 25-hour days keep their real length. Durations are always taken
//! as UTC differences, never as wall-clock arithmetic.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Errors building a time base.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeBaseError {
    /// The identifier is not in the IANA timezone database.
    #[error("unknown timezone {name:?}: {reason}")]
    UnknownZone { name: String, reason: String },
}

/// Upper bound on how far a spring-forward gap can push local midnight.
const MAX_GAP_SCAN_MINUTES: i64 = 24 * 60;

/// UTC/local conversions for one configured IANA timezone.
///
/// Built once from configuration and passed explicitly, so tests can pin the
/// zone independently of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBase {
    tz: Tz,
}

impl TimeBase {
    pub const fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Builds a time base from an IANA identifier such as `Europe/Warsaw`.
    pub fn from_name(name: &str) -> Result<Self, TimeBaseError> {
        let tz = name
            .trim()
            .parse::<Tz>()
            .map_err(|err| TimeBaseError::UnknownZone {
                name: name.to_string(),
                reason: err.to_string(),
            })?;
        Ok(Self::new(tz))
    }

    /// The configured zone.
    #[must_use]
    pub const fn zone(&self) -> Tz {
        self.tz
    }

    /// The IANA identifier of the configured zone.
    #[must_use]
    pub fn zone_name(&self) -> &'static str {
        self.tz.name()
    }

    pub fn to_local(&self, utc: DateTime<Utc>) -> DateTime<Tz> {
        utc.with_timezone(&self.tz)
    }

    /// Local time with a plain numeric offset, suitable for RFC 3339 output.
    pub fn to_local_fixed(&self, utc: DateTime<Utc>) -> DateTime<FixedOffset> {
        self.to_local(utc).fixed_offset()
    }

    /// The local calendar date containing `utc`.
    pub fn local_date(&self, utc: DateTime<Utc>) -> NaiveDate {
        self.to_local(utc).date_naive()
    }

    /// The local date as a `YYYY-MM-DD` key.
    pub fn local_date_key(&self, utc: DateTime<Utc>) -> String {
        self.local_date(utc).format("%Y-%m-%d").to_string()
    }

    /// First instant (UTC) whose local date is `date`.
    pub fn start_of_local_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        if let Some(dt) = self.tz.from_local_datetime(&midnight).earliest() {
            return dt.with_timezone(&Utc);
        }

        // Midnight falls in a spring-forward gap; walk to the first valid minute.
        for minute in 1..=MAX_GAP_SCAN_MINUTES {
            let candidate = midnight + Duration::minutes(minute);
            if let Some(dt) = self.tz.from_local_datetime(&candidate).earliest() {
                return dt.with_timezone(&Utc);
            }
        }

        // No zone has a day-long gap; treat the wall clock as UTC.
        tracing::warn!(zone = self.zone_name(), %date, "no valid local time found for day start");
        midnight.and_utc()
    }

    /// The next local midnight strictly after the start of `date`.
    pub fn local_midnight_after(&self, date: NaiveDate) -> DateTime<Utc> {
        let next = date.succ_opt().unwrap_or(date);
        self.start_of_local_day(next)
    }

    /// Last representable instant (UTC, microsecond precision) of local `date`.
    pub fn end_of_local_day(&self, date: NaiveDate) -> DateTime<Utc> {
        self.local_midnight_after(date) - Duration::microseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warsaw() -> TimeBase {
        TimeBase::from_name("Europe/Warsaw").unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn rejects_unknown_zone() {
        let err = TimeBase::from_name("Mars/Olympus").unwrap_err();
        assert!(matches!(err, TimeBaseError::UnknownZone { .. }));
    }

    #[test]
    fn local_date_differs_from_utc_date_near_midnight() {
        let tb = warsaw();
        // 23:30 UTC in winter is 00:30 the next day in Warsaw.
        let utc = Utc.with_ymd_and_hms(2025, 1, 14, 23, 30, 0).unwrap();
        assert_eq!(tb.local_date(utc), date(2025, 1, 15));
        assert_eq!(tb.local_date_key(utc), "2025-01-15");
        assert_eq!(tb.to_local_fixed(utc).to_rfc3339(), "2025-01-15T00:30:00+01:00");
    }

    #[test]
    fn day_boundaries_in_winter_and_summer() {
        let tb = warsaw();
        assert_eq!(
            tb.start_of_local_day(date(2025, 1, 15)),
            Utc.with_ymd_and_hms(2025, 1, 14, 23, 0, 0).unwrap()
        );
        assert_eq!(
            tb.start_of_local_day(date(2025, 7, 15)),
            Utc.with_ymd_and_hms(2025, 7, 14, 22, 0, 0).unwrap()
        );
        let end = tb.end_of_local_day(date(2025, 1, 15));
        assert_eq!(
            end + Duration::microseconds(1),
            Utc.with_ymd_and_hms(2025, 1, 15, 23, 0, 0).unwrap()
        );
        assert_eq!(tb.local_date(end), date(2025, 1, 15));
    }

    #[test]
    fn dst_transition_days_have_real_length() {
        let tb = warsaw();
        let spring = date(2025, 3, 30);
        let autumn = date(2025, 10, 26);

        let spring_len = tb.local_midnight_after(spring) - tb.start_of_local_day(spring);
        let autumn_len = tb.local_midnight_after(autumn) - tb.start_of_local_day(autumn);

        assert_eq!(spring_len.num_hours(), 23);
        assert_eq!(autumn_len.num_hours(), 25);
    }

    #[test]
    fn nonexistent_midnight_moves_to_first_valid_time() {
        // Santiago springs forward at local midnight: 2024-09-08 00:00 does not exist.
        let tb = TimeBase::from_name("America/Santiago").unwrap();
        let start = tb.start_of_local_day(date(2024, 9, 8));

        assert_eq!(tb.local_date(start), date(2024, 9, 8));
        assert_eq!(tb.to_local(start).format("%H:%M").to_string(), "01:00");
        assert_eq!(tb.local_date(start - Duration::seconds(1)), date(2024, 9, 7));
    }
}
