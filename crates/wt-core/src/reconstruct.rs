//! Shift reconstruction.
//!
//! Turns one employee's chronologically ordered IN/OUT punches into work
//! intervals, in a single forward pass with one "open IN" register.
//!
//! # Rules
//!
//! 1. IN while an IN is open: record `DUPLICATE_IN`, the later IN wins.
//! 2. OUT with nothing open: record `ORPHAN_OUT`, ignore it.
//! 3. OUT earlier than the open IN: record `OUT_BEFORE_IN`, keep the IN open.
//! 4. Any other direction: record `UNKNOWN_DIRECTION`, no state change.
//! 5. An IN still open at the end may be auto-closed at `now`, or at the end of
//!    the IN's local day when that comes first.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::anomaly::{Anomaly, AnomalyCode};
use crate::direction::Direction;
use crate::event::AttendanceRecord;
use crate::timebase::TimeBase;
use crate::types::EmployeeId;

/// Policy for shifts that are still open at the end of the event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconstructOptions {
    /// Synthesize an end for a still-open shift.
    /// Default: true.
    pub auto_close: bool,

    /// Never let a synthesized end run past the local day of its IN.
    /// Default: true.
    pub auto_close_at_day_end: bool,
}

impl Default for ReconstructOptions {
    fn default() -> Self {
        Self {
            auto_close: true,
            auto_close_at_day_end: true,
        }
    }
}

/// One continuous presence period.
///
/// Invariant: `out_utc >= in_utc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkInterval {
    pub employee_id: EmployeeId,
    pub in_utc: DateTime<Utc>,
    pub out_utc: DateTime<Utc>,
    /// The end was synthesized, not a real OUT.
    pub auto_closed: bool,
}

impl WorkInterval {
    /// Whole elapsed seconds.
    pub fn duration_seconds(&self) -> i64 {
        (self.out_utc - self.in_utc).num_seconds()
    }
}

/// Result of reconstructing one employee's event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconstruction {
    pub intervals: Vec<WorkInterval>,
    pub anomalies: Vec<Anomaly>,
    /// An IN remained open at the end of the pass, whether or not it was auto-closed.
    pub has_open_shift: bool,
    /// The IN that remained open, if any.
    pub open_in: Option<DateTime<Utc>>,
}

/// The single "open IN" register.
#[derive(Debug, Clone, Copy)]
struct OpenShift {
    in_utc: DateTime<Utc>,
    local_day: NaiveDate,
}

/// Reconstruct work intervals from an ordered event stream.
///
/// Events must be sorted by timestamp ascending, ties in insertion order.
/// Unordered input is outside the contract but never panics; it only yields
/// spurious anomalies.
///
/// # Arguments
///
/// * `employee_id` - Owner of the events, copied onto every interval
/// * `events` - Events to process (must implement `AttendanceRecord`)
/// * `now` - The evaluation instant, used to close a still-open shift
/// * `timebase` - Local timezone used for the day-end bound
/// * `options` - Auto-close policy
pub fn reconstruct<E: AttendanceRecord>(
    employee_id: EmployeeId,
    events: &[E],
    now: DateTime<Utc>,
    timebase: &TimeBase,
    options: ReconstructOptions,
) -> Reconstruction {
    let mut intervals = Vec::new();
    let mut anomalies = Vec::new();
    let mut open: Option<OpenShift> = None;

    for event in events {
        let ts = event.timestamp();
        let direction = match event.direction().parse::<Direction>() {
            Ok(direction) => direction,
            Err(err) => {
                tracing::debug!(%employee_id, %ts, direction = err.value(), "unknown direction");
                anomalies.push(Anomaly::new(
                    AnomalyCode::UnknownDirection,
                    ts,
                    format!("direction={:?}", err.value()),
                ));
                continue;
            }
        };

        match direction {
            Direction::In => {
                if let Some(previous) = open {
                    tracing::debug!(%employee_id, replaced = %previous.in_utc, %ts, "duplicate IN");
                    anomalies.push(Anomaly::new(
                        AnomalyCode::DuplicateIn,
                        ts,
                        "IN while previous shift is still open; replacing open IN",
                    ));
                }
                open = Some(OpenShift {
                    in_utc: ts,
                    local_day: timebase.local_date(ts),
                });
            }
            Direction::Out => {
                let Some(shift) = open else {
                    tracing::debug!(%employee_id, %ts, "orphan OUT");
                    anomalies.push(Anomaly::new(
                        AnomalyCode::OrphanOut,
                        ts,
                        "OUT without preceding IN; ignored",
                    ));
                    continue;
                };

                if ts < shift.in_utc {
                    tracing::debug!(%employee_id, open_in = %shift.in_utc, %ts, "OUT before IN");
                    anomalies.push(Anomaly::new(
                        AnomalyCode::OutBeforeIn,
                        ts,
                        "OUT earlier than current open IN; ignored",
                    ));
                    continue;
                }

                intervals.push(WorkInterval {
                    employee_id,
                    in_utc: shift.in_utc,
                    out_utc: ts,
                    auto_closed: false,
                });
                open = None;
            }
        }
    }

    let has_open_shift = open.is_some();
    if let Some(shift) = open.filter(|_| options.auto_close) {
        let close_at = if options.auto_close_at_day_end {
            now.min(timebase.end_of_local_day(shift.local_day))
        } else {
            now
        };

        // Reachable when the open IN is later than `now` (clock skew, future-dated manual entry).
        if close_at >= shift.in_utc {
            intervals.push(WorkInterval {
                employee_id,
                in_utc: shift.in_utc,
                out_utc: close_at,
                auto_closed: true,
            });
        } else {
            tracing::warn!(
                %employee_id,
                open_in = %shift.in_utc,
                %close_at,
                "cannot auto-close open shift"
            );
            anomalies.push(Anomaly::new(
                AnomalyCode::AutoCloseInvalid,
                close_at,
                "auto-close time is earlier than IN",
            ));
        }
    }

    Reconstruction {
        intervals,
        anomalies,
        has_open_shift,
        open_in: open.map(|shift| shift.in_utc),
    }
}
