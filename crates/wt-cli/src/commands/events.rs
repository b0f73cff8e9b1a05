//! Events commands: inspect one local day and manage manual entries.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;
use wt_core::{EmployeeId, TimeBase};
use wt_db::{Database, DbError, StoredEvent};

use super::util::local_hm;
use crate::Config;

#[derive(Debug, Serialize)]
struct EventJson<'a> {
    id: i64,
    employee_id: EmployeeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    employee_full_name: Option<&'a str>,
    direction: &'a str,
    ts_utc: DateTime<Utc>,
    ts_local: DateTime<FixedOffset>,
    source: &'a str,
    is_manual: bool,
    comment: Option<&'a str>,
}

impl<'a> EventJson<'a> {
    fn new(event: &'a StoredEvent, timebase: &TimeBase, name: Option<&'a str>) -> Self {
        Self {
            id: event.id,
            employee_id: event.employee_id,
            employee_full_name: name,
            direction: &event.direction,
            ts_utc: event.timestamp,
            ts_local: timebase.to_local_fixed(event.timestamp),
            source: &event.source,
            is_manual: event.is_manual,
            comment: event.comment.as_deref(),
        }
    }
}

/// Lists an employee's events whose local date is `date`, oldest first.
pub fn day<W: Write>(
    writer: &mut W,
    db: &Database,
    timebase: &TimeBase,
    employee_id: EmployeeId,
    date: NaiveDate,
    manual_only: bool,
    json: bool,
) -> Result<Vec<StoredEvent>> {
    let employee = db
        .get_employee(employee_id)?
        .with_context(|| format!("employee {employee_id} not found"))?;

    let start = timebase.start_of_local_day(date);
    let end = timebase.local_midnight_after(date);
    let mut events = db.list_events_between(employee_id, start, end)?;
    if manual_only {
        events.retain(|event| event.is_manual);
    }

    if json {
        let views: Vec<_> = events
            .iter()
            .map(|event| EventJson::new(event, timebase, None))
            .collect();
        writeln!(writer, "{}", serde_json::to_string_pretty(&views)?)?;
        return Ok(events);
    }

    let mut output = format!(
        "{} ({}) on {date} ({})\n",
        employee.full_name,
        employee.id,
        timebase.zone_name()
    );
    if events.is_empty() {
        output.push_str("No events.\n");
    }
    for event in &events {
        let note = match (&event.comment, event.is_manual) {
            (Some(comment), true) => format!("manual: {comment}"),
            (None, true) => "manual".to_string(),
            (_, false) => String::new(),
        };
        let row = format!(
            "{:<6}{}  {:<4}{:<10}{note}",
            event.id,
            timebase.to_local(event.timestamp).format("%H:%M"),
            event.direction,
            event.source,
        );
        let _ = writeln!(output, "{}", row.trim_end());
    }
    write!(writer, "{output}")?;
    Ok(events)
}

/// Lists the most recent manual entries across all employees.
pub fn manual<W: Write>(
    writer: &mut W,
    db: &Database,
    timebase: &TimeBase,
    limit: usize,
    json: bool,
) -> Result<Vec<StoredEvent>> {
    let events = db.list_manual_events(limit)?;
    let names: HashMap<EmployeeId, String> = db
        .list_employees(false)?
        .into_iter()
        .map(|employee| (employee.id, employee.full_name))
        .collect();
    let name_of = |id: &EmployeeId| names.get(id).map_or("?", String::as_str);

    if json {
        let views: Vec<_> = events
            .iter()
            .map(|event| EventJson::new(event, timebase, Some(name_of(&event.employee_id))))
            .collect();
        writeln!(writer, "{}", serde_json::to_string_pretty(&views)?)?;
        return Ok(events);
    }

    if events.is_empty() {
        writeln!(writer, "No manual events.")?;
        return Ok(events);
    }
    let mut output = String::new();
    for event in &events {
        let row = format!(
            "{:<6}{}  {:<4}{:<20}{}",
            event.id,
            local_hm(timebase, event.timestamp),
            event.direction,
            name_of(&event.employee_id),
            event.comment.as_deref().unwrap_or_default(),
        );
        let _ = writeln!(output, "{}", row.trim_end());
    }
    write!(writer, "{output}")?;
    Ok(events)
}

/// Deletes one manual entry and audits the removal.
pub fn delete<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    timebase: &TimeBase,
    id: i64,
) -> Result<StoredEvent> {
    let event = match db.delete_manual_event(id) {
        Ok(event) => event,
        Err(DbError::NotManual(_)) => anyhow::bail!(
            "event {id} was recorded by a terminal; only manual events can be deleted"
        ),
        Err(err) => return Err(err.into()),
    };

    db.record_audit(
        "manual_event_delete",
        &config.operator,
        &json!({
            "event_id": event.id,
            "employee_id": event.employee_id,
        }),
    )?;

    writeln!(
        writer,
        "Deleted manual event {} ({} at {}) for employee {}",
        event.id,
        event.direction,
        local_hm(timebase, event.timestamp),
        event.employee_id
    )?;
    Ok(event)
}
