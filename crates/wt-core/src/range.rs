//! Daily, weekly and monthly summaries over an inclusive local date range.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate};
use serde::Serialize;
use thiserror::Error;

use crate::anomaly::Anomaly;
use crate::day::DayTotals;
use crate::timebase::TimeBase;

/// Errors in a range query.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("from_date {from} is after to_date {to}")]
    Inverted { from: NaiveDate, to: NaiveDate },
}

/// Formats whole seconds as `HH:MM:SS`. Hours are not wrapped at 24.
/// Negative input is treated as zero.
pub fn format_hms(total_seconds: i64) -> String {
    let total = total_seconds.max(0);
    let hh = total / 3600;
    let mm = (total % 3600) / 60;
    let ss = total % 60;
    format!("{hh:02}:{mm:02}:{ss:02}")
}

/// Worked time for one local day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyWorkStat {
    pub date_local: NaiveDate,
    pub worked_seconds: i64,
    pub worked_minutes: i64,
    pub worked_hms: String,
    pub first_in_local: Option<DateTime<FixedOffset>>,
    pub last_out_local: Option<DateTime<FixedOffset>>,
    pub open_shift: bool,
    pub auto_closed: bool,
    pub anomalies: Vec<Anomaly>,
}

/// Worked time for the in-range days of one Monday–Sunday week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekWorkStat {
    /// ISO week label, e.g. `2025-W03`.
    pub iso_week: String,
    pub week_start_local: NaiveDate,
    pub week_end_local: NaiveDate,
    pub worked_seconds: i64,
    pub worked_minutes: i64,
    pub worked_hms: String,
}

/// Worked time for the in-range days of one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthWorkStat {
    /// `YYYY-MM`.
    pub month: String,
    pub worked_seconds: i64,
    pub worked_minutes: i64,
    pub worked_hms: String,
}

/// All roll-ups for a query range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeSummary {
    pub items: Vec<DailyWorkStat>,
    pub weeks: Vec<WeekWorkStat>,
    pub months: Vec<MonthWorkStat>,
    pub total_seconds: i64,
}

/// Roll per-day totals into daily items plus partial week and month sums.
///
/// Every date in `[from, to]` gets an item, including days without activity.
/// Edge weeks and months only sum the days that fall inside the range.
/// Anomalies are attached to the local day of their timestamp.
pub fn summarize_range(
    totals: &DayTotals,
    anomalies: &[Anomaly],
    from: NaiveDate,
    to: NaiveDate,
    timebase: &TimeBase,
) -> Result<RangeSummary, RangeError> {
    if from > to {
        return Err(RangeError::Inverted { from, to });
    }

    let mut anomalies_by_day: BTreeMap<NaiveDate, Vec<Anomaly>> = BTreeMap::new();
    for anomaly in anomalies {
        if let Some(ts) = anomaly.timestamp {
            let date = timebase.local_date(ts);
            if (from..=to).contains(&date) {
                anomalies_by_day.entry(date).or_default().push(anomaly.clone());
            }
        }
    }

    let mut items = Vec::new();
    let mut weeks: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    let mut months: BTreeMap<(i32, u32), i64> = BTreeMap::new();

    for date in from.iter_days().take_while(|date| *date <= to) {
        let day = totals.get(date).copied().unwrap_or_default();
        let seconds = day.worked_seconds;

        let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
        *weeks.entry(monday).or_insert(0) += seconds;
        *months.entry((date.year(), date.month())).or_insert(0) += seconds;

        items.push(DailyWorkStat {
            date_local: date,
            worked_seconds: seconds,
            worked_minutes: seconds / 60,
            worked_hms: format_hms(seconds),
            first_in_local: day.first_in.map(|ts| timebase.to_local_fixed(ts)),
            last_out_local: day.visible_last_out().map(|ts| timebase.to_local_fixed(ts)),
            open_shift: day.open_shift,
            auto_closed: day.auto_closed,
            anomalies: anomalies_by_day.remove(&date).unwrap_or_default(),
        });
    }

    let weeks = weeks
        .into_iter()
        .map(|(monday, seconds)| {
            let iso = monday.iso_week();
            WeekWorkStat {
                iso_week: format!("{}-W{:02}", iso.year(), iso.week()),
                week_start_local: monday,
                week_end_local: monday + Duration::days(6),
                worked_seconds: seconds,
                worked_minutes: seconds / 60,
                worked_hms: format_hms(seconds),
            }
        })
        .collect();

    let months = months
        .into_iter()
        .map(|((year, month), seconds)| MonthWorkStat {
            month: format!("{year:04}-{month:02}"),
            worked_seconds: seconds,
            worked_minutes: seconds / 60,
            worked_hms: format_hms(seconds),
        })
        .collect();

    let total_seconds = items.iter().map(|item| item.worked_seconds).sum();

    Ok(RangeSummary {
        items,
        weeks,
        months,
        total_seconds,
    })
}
