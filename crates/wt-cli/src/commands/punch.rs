//! Punch command: admit one badge swipe.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::json;
use wt_core::TimeBase;
use wt_db::{Database, StoredEvent};

use super::util::{local_hm, parse_instant};
use crate::{Config, PunchArgs};

/// Records a punch. An explicit `--at` makes it a manual entry, which needs a
/// comment and is audited.
pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    args: &PunchArgs,
    timebase: &TimeBase,
    now: DateTime<Utc>,
) -> Result<StoredEvent> {
    let employee = match (&args.employee, &args.uid) {
        (Some(id), _) => db
            .get_employee(*id)?
            .with_context(|| format!("employee {id} not found"))?,
        (None, Some(uid)) => db
            .find_employee_by_uid(uid)?
            .with_context(|| format!("no employee with badge UID {uid:?}"))?,
        (None, None) => anyhow::bail!("either --employee or --uid is required"),
    };

    let event = match &args.at {
        Some(raw) => {
            let at = parse_instant(raw, timebase, now)?;
            let comment = args
                .comment
                .as_deref()
                .context("--comment is required with --at")?;
            db.record_manual_event(employee.id, args.direction, at, &args.source, comment)
        }
        None => db.record_punch(employee.id, args.direction, now, &args.source),
    }
    .with_context(|| format!("failed to record punch for employee {}", employee.id))?;
    tracing::debug!(
        event_id = event.id,
        employee = %employee.id,
        direction = %event.direction,
        manual = event.is_manual,
        "punch recorded"
    );

    if event.is_manual {
        db.record_audit(
            "manual_event_create",
            &config.operator,
            &json!({
                "event_id": event.id,
                "employee_id": employee.id,
                "direction": event.direction,
                "ts_utc": event.timestamp,
                "source": event.source,
                "comment": event.comment,
            }),
        )?;
    }

    writeln!(
        writer,
        "{} recorded for {} ({}) at {} ({})",
        event.direction,
        employee.full_name,
        employee.id,
        local_hm(timebase, event.timestamp),
        timebase.zone_name()
    )?;
    Ok(event)
}
