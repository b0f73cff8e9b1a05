//! Import command for bulk-loading punches from JSONL.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use wt_core::{Direction, EmployeeId, TimeBase};
use wt_db::{Database, NewEvent};

use super::util::parse_instant;
use crate::Config;

const DEFAULT_SOURCE: &str = "import";

pub fn run<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    timebase: &TimeBase,
    now: DateTime<Utc>,
) -> Result<usize> {
    let events = parse_events(reader, timebase, now)?;
    let inserted = db.insert_events(&events).context("failed to store imported events")?;

    let mut employees: Vec<EmployeeId> = events.iter().map(|event| event.employee_id).collect();
    employees.sort_unstable();
    employees.dedup();
    db.record_audit(
        "events_import",
        &config.operator,
        &json!({ "inserted": inserted, "employee_ids": employees }),
    )?;

    writeln!(writer, "Imported {inserted} events")?;
    Ok(inserted)
}

fn parse_events<R: BufRead>(
    reader: R,
    timebase: &TimeBase,
    now: DateTime<Utc>,
) -> Result<Vec<NewEvent>> {
    let mut events = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let parsed: ImportEvent = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid JSON on line {}", idx + 1))?;
        let event = parsed
            .into_event(timebase, now)
            .with_context(|| format!("invalid event on line {}", idx + 1))?;
        events.push(event);
    }
    Ok(events)
}

#[derive(Debug, Deserialize)]
struct ImportEvent {
    employee_id: EmployeeId,
    direction: Direction,
    ts: String,
    #[serde(default)]
    source: Option<String>,
}

impl ImportEvent {
    fn into_event(self, timebase: &TimeBase, now: DateTime<Utc>) -> Result<NewEvent> {
        let timestamp = parse_instant(&self.ts, timebase, now)?;
        let source = self
            .source
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string());
        Ok(NewEvent {
            employee_id: self.employee_id,
            direction: self.direction,
            timestamp,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use chrono::TimeZone;

    fn tb() -> TimeBase {
        TimeBase::from_name("Europe/Warsaw").unwrap()
    }

    #[test]
    fn parse_events_accepts_offsets_and_local_times() {
        let input = concat!(
            r#"{"employee_id":1,"direction":"IN","ts":"2025-03-10T07:00:00Z"}"#,
            "\n\n",
            r#"{"employee_id":1,"direction":"out","ts":"2025-03-10 16:30","source":"terminal-2"}"#,
            "\n",
        );
        let events = parse_events(Cursor::new(input), &tb(), Utc::now()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].source, "import");
        assert_eq!(events[1].direction, Direction::Out);
        assert_eq!(events[1].timestamp, Utc.with_ymd_and_hms(2025, 3, 10, 15, 30, 0).unwrap());
        assert_eq!(events[1].source, "terminal-2");
    }

    #[test]
    fn parse_events_reports_line_numbers() {
        let input = concat!(
            r#"{"employee_id":1,"direction":"IN","ts":"2025-03-10T07:00:00Z"}"#,
            "\n",
            r#"{"employee_id":1,"direction":"BREAK","ts":"2025-03-10T08:00:00Z"}"#,
        );
        let err = parse_events(Cursor::new(input), &tb(), Utc::now()).unwrap_err();
        assert!(err.to_string().contains("invalid JSON on line 2"));

        let err = parse_events(
            Cursor::new(r#"{"employee_id":1,"direction":"IN","ts":"soon"}"#),
            &tb(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid event on line 1"));
    }

    #[test]
    fn import_stores_events_and_audits() {
        let mut db = Database::open_in_memory().unwrap();
        let employee = db.add_employee("Anna Kowalska", "04:A2").unwrap();
        let input = concat!(
            r#"{"employee_id":1,"direction":"IN","ts":"2025-03-10T07:00:00Z"}"#,
            "\n",
            r#"{"employee_id":1,"direction":"OUT","ts":"2025-03-10T15:00:00Z"}"#,
        );

        let mut output = Vec::new();
        let config = Config::default();
        let inserted =
            run(Cursor::new(input), &mut output, &mut db, &config, &tb(), Utc::now()).unwrap();

        assert_eq!(inserted, 2);
        assert_eq!(String::from_utf8(output).unwrap(), "Imported 2 events\n");
        assert_eq!(db.list_events_for_employee(employee.id).unwrap().len(), 2);
        let audit = db.list_audit(1, Some("events_import")).unwrap();
        assert_eq!(audit[0].details["inserted"], 2);
        assert_eq!(audit[0].details["employee_ids"], json!([1]));
    }

    #[test]
    fn import_for_unknown_employee_stores_nothing() {
        let mut db = Database::open_in_memory().unwrap();
        let input = r#"{"employee_id":4,"direction":"IN","ts":"2025-03-10T07:00:00Z"}"#;
        let mut output = Vec::new();
        let config = Config::default();
        assert!(run(Cursor::new(input), &mut output, &mut db, &config, &tb(), Utc::now()).is_err());
        assert!(db.list_audit(10, None).unwrap().is_empty());
    }
}
