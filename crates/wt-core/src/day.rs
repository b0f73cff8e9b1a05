//! Per-local-day accounting of work intervals.
//!
//! Intervals are split at local midnights, so a shift crossing midnight
//! contributes to both days it touches.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::reconstruct::WorkInterval;
use crate::timebase::TimeBase;

/// Split an interval into whole seconds per local calendar date.
///
/// Returns an empty map unless `out_utc > in_utc`. Segment lengths come from
/// UTC differences and are derived from cumulative offsets relative to
/// `in_utc`, so the buckets always sum to the interval's whole-second length.
pub fn split_by_local_day(
    interval: &WorkInterval,
    timebase: &TimeBase,
) -> BTreeMap<NaiveDate, i64> {
    let mut buckets = BTreeMap::new();
    if interval.out_utc <= interval.in_utc {
        return buckets;
    }

    let end_date = timebase.local_date(interval.out_utc);
    let mut cursor_date = timebase.local_date(interval.in_utc);
    let mut consumed = 0_i64;

    while cursor_date < end_date {
        let boundary = timebase.local_midnight_after(cursor_date);
        let elapsed = (boundary - interval.in_utc).num_seconds();
        let seconds = elapsed - consumed;
        if seconds > 0 {
            *buckets.entry(cursor_date).or_insert(0) += seconds;
        }
        consumed = elapsed;
        // A zone that skips a whole date must still make progress.
        let next_date = timebase.local_date(boundary);
        cursor_date = if next_date > cursor_date { next_date } else { end_date };
    }

    let remainder = interval.duration_seconds() - consumed;
    if remainder > 0 {
        *buckets.entry(end_date).or_insert(0) += remainder;
    }

    buckets
}

/// Accumulated activity for one local day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayStat {
    pub worked_seconds: i64,
    /// Earliest IN whose local date is this day.
    pub first_in: Option<DateTime<Utc>>,
    /// Latest real OUT whose local date is this day. Synthesized ends never land here.
    pub last_out: Option<DateTime<Utc>>,
    /// A still-open shift started on this day.
    pub open_shift: bool,
    /// An auto-closed interval started on this day.
    pub auto_closed: bool,
}

impl DayStat {
    /// The checkout to surface. Withheld while the day holds an open shift.
    pub const fn visible_last_out(&self) -> Option<DateTime<Utc>> {
        if self.open_shift { None } else { self.last_out }
    }
}

/// Per-day totals across all of an employee's intervals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayTotals {
    pub days: BTreeMap<NaiveDate, DayStat>,
    /// Local day of the shift that is still open, if any.
    pub open_shift_day: Option<NaiveDate>,
}

impl DayTotals {
    pub fn get(&self, date: NaiveDate) -> Option<&DayStat> {
        self.days.get(&date)
    }

    pub fn worked_seconds(&self, date: NaiveDate) -> i64 {
        self.days.get(&date).map_or(0, |day| day.worked_seconds)
    }
}

/// Aggregate intervals into per-local-day statistics.
///
/// The open-shift day is the IN date of the most recent auto-closed interval.
/// When auto-close is disabled no such interval exists, so the still-open IN
/// (`open_in`) identifies the day instead.
pub fn aggregate_days(
    intervals: &[WorkInterval],
    open_in: Option<DateTime<Utc>>,
    timebase: &TimeBase,
) -> DayTotals {
    let mut days: BTreeMap<NaiveDate, DayStat> = BTreeMap::new();

    for interval in intervals {
        for (date, seconds) in split_by_local_day(interval, timebase) {
            days.entry(date).or_default().worked_seconds += seconds;
        }

        let in_day = days.entry(timebase.local_date(interval.in_utc)).or_default();
        in_day.first_in = Some(in_day.first_in.map_or(interval.in_utc, |t| t.min(interval.in_utc)));
        if interval.auto_closed {
            in_day.auto_closed = true;
        } else {
            let out_day = days.entry(timebase.local_date(interval.out_utc)).or_default();
            let out_utc = interval.out_utc;
            out_day.last_out = Some(out_day.last_out.map_or(out_utc, |t| t.max(out_utc)));
        }
    }

    let open_shift_day = intervals
        .iter()
        .rev()
        .find(|interval| interval.auto_closed)
        .map(|interval| interval.in_utc)
        .or(open_in)
        .map(|ts| timebase.local_date(ts));

    if let Some(date) = open_shift_day {
        days.entry(date).or_default().open_shift = true;
    }

    DayTotals {
        days,
        open_shift_day,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};

    use crate::types::EmployeeId;

    fn tb() -> TimeBase {
        TimeBase::from_name("Europe/Warsaw").unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Warsaw wall-clock on a winter date (UTC+1).
    fn local(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, d, h, m, 0).unwrap() - Duration::hours(1)
    }

    fn interval(in_utc: DateTime<Utc>, out_utc: DateTime<Utc>, auto_closed: bool) -> WorkInterval {
        WorkInterval {
            employee_id: EmployeeId::new(1).unwrap(),
            in_utc,
            out_utc,
            auto_closed,
        }
    }

    #[test]
    fn single_day_interval_yields_one_bucket() {
        let split = split_by_local_day(&interval(local(15, 8, 0), local(15, 16, 0), false), &tb());
        assert_eq!(split.into_iter().collect::<Vec<_>>(), vec![(date(2025, 1, 15), 28_800)]);
    }

    #[test]
    fn cross_midnight_interval_splits_in_two() {
        let split = split_by_local_day(&interval(local(15, 23, 0), local(16, 1, 0), false), &tb());
        assert_eq!(
            split.into_iter().collect::<Vec<_>>(),
            vec![(date(2025, 1, 15), 3600), (date(2025, 1, 16), 3600)]
        );
    }

    #[test]
    fn interval_ending_exactly_at_midnight_has_no_empty_bucket() {
        let split = split_by_local_day(&interval(local(15, 22, 0), local(16, 0, 0), false), &tb());
        assert_eq!(split.into_iter().collect::<Vec<_>>(), vec![(date(2025, 1, 15), 7200)]);
    }

    #[test]
    fn multi_day_interval_has_full_middle_days() {
        let split = split_by_local_day(&interval(local(15, 20, 0), local(18, 4, 0), false), &tb());
        assert_eq!(
            split.into_iter().collect::<Vec<_>>(),
            vec![
                (date(2025, 1, 15), 4 * 3600),
                (date(2025, 1, 16), 86_400),
                (date(2025, 1, 17), 86_400),
                (date(2025, 1, 18), 4 * 3600),
            ]
        );
    }

    #[test]
    fn empty_or_inverted_interval_yields_nothing() {
        let empty = interval(local(15, 8, 0), local(15, 8, 0), false);
        let inverted = interval(local(15, 9, 0), local(15, 8, 0), false);
        assert!(split_by_local_day(&empty, &tb()).is_empty());
        assert!(split_by_local_day(&inverted, &tb()).is_empty());
    }

    #[test]
    fn split_preserves_duration_with_subsecond_timestamps() {
        let in_utc = local(15, 22, 59) + Duration::milliseconds(400);
        let out_utc = local(17, 0, 30) + Duration::milliseconds(300);
        let iv = interval(in_utc, out_utc, false);

        let total: i64 = split_by_local_day(&iv, &tb()).values().sum();
        assert_eq!(total, iv.duration_seconds());
    }

    #[test]
    fn dst_days_count_real_elapsed_time() {
        // Warsaw springs forward on 2025-03-30: the local day has 23 hours.
        let tb = tb();
        let start = tb.start_of_local_day(date(2025, 3, 30));
        let end = tb.local_midnight_after(date(2025, 3, 30));
        let iv = interval(start - Duration::hours(1), end + Duration::hours(1), false);
        let split = split_by_local_day(&iv, &tb);

        assert_eq!(split[&date(2025, 3, 29)], 3600);
        assert_eq!(split[&date(2025, 3, 30)], 23 * 3600);
        assert_eq!(split[&date(2025, 3, 31)], 3600);
    }

    #[test]
    fn shift_across_fall_back_day() {
        // 2025-10-26 has 25 hours in Warsaw.
        let iv = interval(
            Utc.with_ymd_and_hms(2025, 10, 25, 20, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 10, 27, 6, 0, 0).unwrap(),
            false,
        );
        let rendered: String = split_by_local_day(&iv, &tb())
            .iter()
            .map(|(date, seconds)| format!("{date} {seconds}\n"))
            .collect();
        insta::assert_snapshot!(rendered, @r"
        2025-10-25 7200
        2025-10-26 90000
        2025-10-27 25200
        ");
    }

    #[test]
    fn aggregate_tracks_first_in_and_real_last_out() {
        let intervals = [
            interval(local(15, 8, 0), local(15, 12, 0), false),
            interval(local(15, 13, 0), local(15, 17, 30), false),
        ];
        let totals = aggregate_days(&intervals, None, &tb());
        let day = totals.get(date(2025, 1, 15)).unwrap();

        assert_eq!(day.worked_seconds, 4 * 3600 + 4 * 3600 + 1800);
        assert_eq!(day.first_in, Some(local(15, 8, 0)));
        assert_eq!(day.visible_last_out(), Some(local(15, 17, 30)));
        assert!(!day.open_shift);
        assert_eq!(totals.open_shift_day, None);
    }

    #[test]
    fn night_shift_attributes_first_in_and_last_out_to_their_own_days() {
        let intervals = [interval(local(15, 22, 0), local(16, 6, 0), false)];
        let totals = aggregate_days(&intervals, None, &tb());

        let first = totals.get(date(2025, 1, 15)).unwrap();
        let second = totals.get(date(2025, 1, 16)).unwrap();
        assert_eq!(first.worked_seconds, 2 * 3600);
        assert_eq!(first.first_in, Some(local(15, 22, 0)));
        assert_eq!(first.last_out, None);
        assert_eq!(second.worked_seconds, 6 * 3600);
        assert_eq!(second.first_in, None);
        assert_eq!(second.last_out, Some(local(16, 6, 0)));
    }

    #[test]
    fn auto_closed_day_withholds_last_out() {
        let intervals = [
            interval(local(15, 7, 0), local(15, 11, 0), false),
            interval(local(15, 12, 0), local(15, 18, 0), true),
        ];
        let totals = aggregate_days(&intervals, Some(local(15, 12, 0)), &tb());
        let day = totals.get(date(2025, 1, 15)).unwrap();

        assert_eq!(totals.open_shift_day, Some(date(2025, 1, 15)));
        assert!(day.open_shift);
        assert!(day.auto_closed);
        assert_eq!(day.last_out, Some(local(15, 11, 0)));
        assert_eq!(day.visible_last_out(), None);
        assert_eq!(day.worked_seconds, 10 * 3600);
    }

    #[test]
    fn open_shift_without_auto_close_flags_its_day() {
        let totals = aggregate_days(&[], Some(local(16, 9, 0)), &tb());

        assert_eq!(totals.open_shift_day, Some(date(2025, 1, 16)));
        assert!(totals.get(date(2025, 1, 16)).unwrap().open_shift);
        assert_eq!(totals.worked_seconds(date(2025, 1, 16)), 0);
    }
}
