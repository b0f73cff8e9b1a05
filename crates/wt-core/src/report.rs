//! Per-employee reports built from the raw event list.
//!
//! Nothing is cached: every report reconstructs intervals from the events it
//! is given, so deleting or correcting an event needs no invalidation.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rayon::prelude::*;
use serde::Serialize;

use crate::anomaly::Anomaly;
use crate::day::aggregate_days;
use crate::event::AttendanceRecord;
use crate::range::{
    DailyWorkStat, MonthWorkStat, RangeError, WeekWorkStat, format_hms, summarize_range,
};
use crate::reconstruct::{ReconstructOptions, WorkInterval, reconstruct};
use crate::timebase::TimeBase;
use crate::types::EmployeeId;

/// Everything a report needs besides the events themselves.
///
/// `now` is explicit so that reports are reproducible.
#[derive(Debug, Clone, Copy)]
pub struct ReportContext {
    pub now: DateTime<Utc>,
    pub timebase: TimeBase,
    pub options: ReconstructOptions,
}

/// An interval as shown to report consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntervalView {
    pub in_utc: DateTime<Utc>,
    pub out_utc: DateTime<Utc>,
    pub in_local: DateTime<FixedOffset>,
    pub out_local: DateTime<FixedOffset>,
    pub seconds: i64,
    pub minutes: i64,
    pub auto_closed: bool,
}

impl IntervalView {
    fn new(interval: &WorkInterval, timebase: &TimeBase) -> Self {
        let seconds = interval.duration_seconds();
        Self {
            in_utc: interval.in_utc,
            out_utc: interval.out_utc,
            in_local: timebase.to_local_fixed(interval.in_utc),
            out_local: timebase.to_local_fixed(interval.out_utc),
            seconds,
            minutes: seconds / 60,
            auto_closed: interval.auto_closed,
        }
    }
}

/// A source event as shown to report consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Raw stored direction, including values the reconstructor rejected.
    pub direction: String,
    pub ts_utc: DateTime<Utc>,
    pub ts_local: DateTime<FixedOffset>,
}

impl EventView {
    fn new<E: AttendanceRecord>(event: &E, timebase: &TimeBase) -> Self {
        let ts = event.timestamp();
        Self {
            id: event.event_id(),
            direction: event.direction().to_string(),
            ts_utc: ts,
            ts_local: timebase.to_local_fixed(ts),
        }
    }
}

/// Whole-history totals for one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeStats {
    pub employee_id: EmployeeId,
    pub total_seconds: i64,
    pub total_minutes: i64,
    pub total_hms: String,
    pub intervals: Vec<IntervalView>,
    pub events: Vec<EventView>,
    pub has_open_shift: bool,
    pub anomalies: Vec<Anomaly>,
}

/// Daily, weekly and monthly totals for one employee over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeDailyStats {
    pub employee_id: EmployeeId,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub items: Vec<DailyWorkStat>,
    pub total_seconds: i64,
    pub total_minutes: i64,
    pub total_hms: String,
    pub weeks: Vec<WeekWorkStat>,
    pub months: Vec<MonthWorkStat>,
}

/// One employee's ordered events, as fetched by the caller.
#[derive(Debug, Clone)]
pub struct EmployeeEvents<E> {
    pub employee_id: EmployeeId,
    pub events: Vec<E>,
}

/// Raw stats across the employee's whole event history.
pub fn employee_stats<E: AttendanceRecord>(
    employee_id: EmployeeId,
    events: &[E],
    ctx: &ReportContext,
) -> EmployeeStats {
    let reconstruction = reconstruct(employee_id, events, ctx.now, &ctx.timebase, ctx.options);
    let intervals: Vec<IntervalView> = reconstruction
        .intervals
        .iter()
        .map(|interval| IntervalView::new(interval, &ctx.timebase))
        .collect();
    let total_seconds = intervals.iter().map(|view| view.seconds).sum();

    EmployeeStats {
        employee_id,
        total_seconds,
        total_minutes: total_seconds / 60,
        total_hms: format_hms(total_seconds),
        intervals,
        events: events.iter().map(|event| EventView::new(event, &ctx.timebase)).collect(),
        has_open_shift: reconstruction.has_open_shift,
        anomalies: reconstruction.anomalies,
    }
}

/// Per-day stats for `[from, to]` (local dates, inclusive) with week and month roll-ups.
pub fn employee_daily_stats<E: AttendanceRecord>(
    employee_id: EmployeeId,
    events: &[E],
    from: NaiveDate,
    to: NaiveDate,
    ctx: &ReportContext,
) -> Result<EmployeeDailyStats, RangeError> {
    let reconstruction = reconstruct(employee_id, events, ctx.now, &ctx.timebase, ctx.options);
    let totals = aggregate_days(&reconstruction.intervals, reconstruction.open_in, &ctx.timebase);
    let summary = summarize_range(&totals, &reconstruction.anomalies, from, to, &ctx.timebase)?;

    Ok(EmployeeDailyStats {
        employee_id,
        from_date: from,
        to_date: to,
        items: summary.items,
        total_seconds: summary.total_seconds,
        total_minutes: summary.total_seconds / 60,
        total_hms: format_hms(summary.total_seconds),
        weeks: summary.weeks,
        months: summary.months,
    })
}

/// Daily stats for many employees at once.
///
/// Each employee is independent, so the work is spread over the rayon pool.
/// Output order follows input order.
pub fn daily_stats_for_all<E: AttendanceRecord + Sync>(
    batches: &[EmployeeEvents<E>],
    from: NaiveDate,
    to: NaiveDate,
    ctx: &ReportContext,
) -> Result<Vec<EmployeeDailyStats>, RangeError> {
    if from > to {
        return Err(RangeError::Inverted { from, to });
    }
    batches
        .par_iter()
        .map(|batch| employee_daily_stats(batch.employee_id, &batch.events, from, to, ctx))
        .collect()
}
