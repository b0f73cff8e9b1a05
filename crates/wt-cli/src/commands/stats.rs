//! Stats command: whole-history worked time for one employee.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use wt_core::{EmployeeId, EmployeeStats, ReportContext, TimeBase, employee_stats};
use wt_db::Database;

use super::util::local_hm;

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    employee_id: EmployeeId,
    ctx: &ReportContext,
    json: bool,
) -> Result<EmployeeStats> {
    let events = db.list_events_for_employee(employee_id)?;
    if events.is_empty() {
        anyhow::bail!("No events for employee {employee_id}");
    }

    let stats = employee_stats(employee_id, &events, ctx);
    tracing::debug!(
        %employee_id,
        events = events.len(),
        intervals = stats.intervals.len(),
        anomalies = stats.anomalies.len(),
        "computed stats"
    );

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&stats)?)?;
    } else {
        write!(writer, "{}", format_stats(&stats, &ctx.timebase))?;
    }
    Ok(stats)
}

fn format_stats(stats: &EmployeeStats, timebase: &TimeBase) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "Employee {}: {} worked ({} min)",
        stats.employee_id, stats.total_hms, stats.total_minutes
    );
    let _ = writeln!(output, "Timezone: {}", timebase.zone_name());
    let _ = writeln!(output, "Open shift: {}", if stats.has_open_shift { "yes" } else { "no" });

    if !stats.intervals.is_empty() {
        output.push('\n');
        let _ = writeln!(output, "{:<19}{:<19}{}", "IN", "OUT", "WORKED");
        for interval in &stats.intervals {
            let worked = wt_core::format_hms(interval.seconds);
            let marker = if interval.auto_closed { " (auto-closed)" } else { "" };
            let _ = writeln!(
                output,
                "{:<19}{:<19}{worked}{marker}",
                local_hm(timebase, interval.in_utc),
                local_hm(timebase, interval.out_utc),
            );
        }
    }

    if !stats.anomalies.is_empty() {
        output.push('\n');
        output.push_str("Anomalies:\n");
        for anomaly in &stats.anomalies {
            let at = anomaly
                .timestamp
                .map_or_else(|| "-".to_string(), |ts| local_hm(timebase, ts));
            let details = anomaly.details.as_deref().unwrap_or("");
            let line = format!("  {:<20}{:<19}{details}", anomaly.code, at);
            let _ = writeln!(output, "{}", line.trim_end());
        }
    }
    output
}
