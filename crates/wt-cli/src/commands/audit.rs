//! Audit command: recent admin actions, newest first.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use wt_core::TimeBase;
use wt_db::{AuditEntry, Database};

use super::util::local_hm;
use crate::AuditArgs;

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    args: &AuditArgs,
    timebase: &TimeBase,
) -> Result<()> {
    let entries = db.list_audit(args.limit, args.action.as_deref())?;
    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&entries)?)?;
    } else {
        write!(writer, "{}", format_entries(&entries, timebase))?;
    }
    Ok(())
}

fn format_entries(entries: &[AuditEntry], timebase: &TimeBase) -> String {
    if entries.is_empty() {
        return "No audit entries.\n".to_string();
    }
    let mut output = String::new();
    for entry in entries {
        let _ = writeln!(
            output,
            "{}  {:<10}{:<20}{}",
            local_hm(timebase, entry.ts),
            entry.actor,
            entry.action_label,
            entry.details
        );
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn filters_by_action_newest_first() {
        let mut db = Database::open_in_memory().unwrap();
        db.record_audit("employee_create", "admin", &json!({ "employee_id": 1 })).unwrap();
        db.record_audit("events_import", "admin", &json!({ "inserted": 4 })).unwrap();
        db.record_audit("employee_create", "kiosk", &json!({ "employee_id": 2 })).unwrap();

        let args = AuditArgs {
            limit: 10,
            action: Some("employee_create".to_string()),
            json: true,
        };
        let mut output = Vec::new();
        run(&mut output, &db, &args, &TimeBase::from_name("UTC").unwrap()).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        let entries = value.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["actor"], "kiosk");
        assert_eq!(entries[0]["action_label"], "Employee created");
        assert_eq!(entries[1]["details"]["employee_id"], 1);
    }

    #[test]
    fn human_rows_show_label_and_details() {
        let mut db = Database::open_in_memory().unwrap();
        db.record_audit("clear_day_events", "admin", &json!({ "deleted": 2 })).unwrap();
        let entries = db.list_audit(5, None).unwrap();
        let utc = TimeBase::from_name("UTC").unwrap();
        let text = format_entries(&entries, &utc);
        assert!(text.ends_with("admin     Day events cleared  {\"deleted\":2}\n"), "{text}");
        assert_eq!(format_entries(&[], &utc), "No audit entries.\n");
    }
}
