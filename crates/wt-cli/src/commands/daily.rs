//! Daily command: per-day, per-week and per-month worked time over a date range.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use wt_core::{
    EmployeeDailyStats, EmployeeEvents, ReportContext, daily_stats_for_all, employee_daily_stats,
};
use wt_db::{Database, EmployeeRecord};

use crate::DailyArgs;

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    args: &DailyArgs,
    ctx: &ReportContext,
) -> Result<Vec<EmployeeDailyStats>> {
    let employees = if args.all {
        db.list_employees(true)?
    } else {
        let id = args.employee.context("either an employee ID or --all is required")?;
        vec![db.get_employee(id)?.with_context(|| format!("employee {id} not found"))?]
    };

    let reports = if let [employee] = employees.as_slice() {
        let events = db.list_events_for_employee(employee.id)?;
        vec![employee_daily_stats(employee.id, &events, args.from, args.to, ctx)?]
    } else {
        let mut batches = Vec::with_capacity(employees.len());
        for employee in &employees {
            batches.push(EmployeeEvents {
                employee_id: employee.id,
                events: db.list_events_for_employee(employee.id)?,
            });
        }
        daily_stats_for_all(&batches, args.from, args.to, ctx)?
    };
    tracing::debug!(
        employees = reports.len(),
        from = %args.from,
        to = %args.to,
        "computed daily stats"
    );

    if args.json {
        if args.all {
            writeln!(writer, "{}", serde_json::to_string_pretty(&reports)?)?;
        } else if let Some(report) = reports.first() {
            writeln!(writer, "{}", serde_json::to_string_pretty(report)?)?;
        }
        return Ok(reports);
    }

    if reports.is_empty() {
        writeln!(writer, "No active employees.")?;
    }
    for (idx, (employee, report)) in employees.iter().zip(&reports).enumerate() {
        if idx > 0 {
            writeln!(writer)?;
        }
        write!(writer, "{}", format_daily(employee, report, ctx.timebase.zone_name()))?;
    }
    Ok(reports)
}

fn hm(ts: Option<DateTime<FixedOffset>>) -> String {
    ts.map_or_else(|| "-".to_string(), |ts| ts.format("%H:%M").to_string())
}

fn format_daily(employee: &EmployeeRecord, report: &EmployeeDailyStats, zone: &str) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "{} ({}) {}..{} [{zone}]",
        employee.full_name, employee.id, report.from_date, report.to_date
    );
    let _ = writeln!(output, "{:<12}{:<10}{:<10}{:<10}{}", "DATE", "WORKED", "IN", "OUT", "NOTES");
    for item in &report.items {
        let mut notes = Vec::new();
        if item.open_shift {
            notes.push("open".to_string());
        }
        if item.auto_closed {
            notes.push("auto-closed".to_string());
        }
        if !item.anomalies.is_empty() {
            let codes: Vec<&str> = item.anomalies.iter().map(|a| a.code.as_str()).collect();
            notes.push(codes.join(","));
        }
        let line = format!(
            "{:<12}{:<10}{:<10}{:<10}{}",
            item.date_local.to_string(),
            item.worked_hms,
            hm(item.first_in_local),
            hm(item.last_out_local),
            notes.join(" ")
        );
        let _ = writeln!(output, "{}", line.trim_end());
    }

    output.push_str("\nWEEKS\n");
    for week in &report.weeks {
        let _ = writeln!(
            output,
            "{:<10}{}..{}  {}",
            week.iso_week, week.week_start_local, week.week_end_local, week.worked_hms
        );
    }
    output.push_str("\nMONTHS\n");
    for month in &report.months {
        let _ = writeln!(output, "{:<10}{}", month.month, month.worked_hms);
    }
    let _ = writeln!(output, "\nTOTAL     {}", report.total_hms);
    output
}
