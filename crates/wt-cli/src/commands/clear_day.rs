//! Clear-day command: remove one employee's events for one local date.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::json;
use wt_core::{EmployeeId, TimeBase};
use wt_db::Database;

use crate::Config;

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    timebase: &TimeBase,
    employee_id: EmployeeId,
    date: NaiveDate,
) -> Result<usize> {
    if db.get_employee(employee_id)?.is_none() {
        anyhow::bail!("employee {employee_id} not found");
    }

    let start = timebase.start_of_local_day(date);
    let end = timebase.local_midnight_after(date);
    let deleted = db
        .delete_events_between(employee_id, start, end)
        .with_context(|| format!("failed to clear {date} for employee {employee_id}"))?;

    db.record_audit(
        "clear_day_events",
        &config.operator,
        &json!({
            "employee_id": employee_id,
            "date_local": date,
            "timezone": timebase.zone_name(),
            "deleted": deleted,
        }),
    )?;

    writeln!(writer, "Deleted {deleted} events for employee {employee_id} on {date}")?;
    Ok(deleted)
}
