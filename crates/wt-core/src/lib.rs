//! Core domain logic for the attendance tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Time base: UTC to local-timezone conversion and local-day boundaries
//! - Reconstruction: turning raw IN/OUT punches into work intervals and anomalies
//! - Day splitting: distributing intervals over local calendar days
//! - Range aggregation: daily, weekly and monthly worked-time summaries
//!
//! Everything here is pure and synchronous. Callers supply the ordered events,
//! the evaluation instant and the configured timezone explicitly.

mod anomaly;
pub mod day;
pub mod direction;
pub mod event;
pub mod range;
mod reconstruct;
pub mod report;
pub mod timebase;
pub mod types;

pub use anomaly::{Anomaly, AnomalyCode};
pub use day::{DayStat, DayTotals, aggregate_days, split_by_local_day};
pub use direction::{Direction, UnknownDirection};
pub use event::{AttendanceEvent, AttendanceRecord};
pub use range::{
    DailyWorkStat, MonthWorkStat, RangeError, RangeSummary, WeekWorkStat, format_hms,
    summarize_range,
};
pub use reconstruct::{ReconstructOptions, Reconstruction, WorkInterval, reconstruct};
pub use report::{
    EmployeeDailyStats, EmployeeEvents, EmployeeStats, EventView, IntervalView, ReportContext,
    daily_stats_for_all, employee_daily_stats, employee_stats,
};
pub use timebase::{TimeBase, TimeBaseError};
pub use types::{EmployeeId, ValidationError};
