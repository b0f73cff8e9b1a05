//! Employee management commands.

use std::io::Write;

use anyhow::{Context, Result};
use serde_json::json;
use wt_core::EmployeeId;
use wt_db::{Database, EmployeeRecord};

use crate::Config;

pub fn add<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    name: &str,
    uid: &str,
) -> Result<EmployeeRecord> {
    let employee = db.add_employee(name, uid).context("failed to add employee")?;
    db.record_audit(
        "employee_create",
        &config.operator,
        &json!({
            "employee_id": employee.id,
            "full_name": employee.full_name,
            "nfc_uid": employee.nfc_uid,
        }),
    )?;
    writeln!(writer, "Added employee {} ({})", employee.id, employee.full_name)?;
    Ok(employee)
}

pub fn set_active<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    id: EmployeeId,
    active: bool,
) -> Result<()> {
    if !db.set_employee_active(id, active)? {
        anyhow::bail!("employee {id} not found");
    }
    db.record_audit(
        "employee_update",
        &config.operator,
        &json!({ "employee_id": id, "is_active": active }),
    )?;
    let state = if active { "activated" } else { "deactivated" };
    writeln!(writer, "Employee {id} {state}")?;
    Ok(())
}

pub fn list<W: Write>(
    writer: &mut W,
    db: &Database,
    include_inactive: bool,
    json: bool,
) -> Result<()> {
    let employees = db.list_employees(!include_inactive)?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&employees)?)?;
        return Ok(());
    }
    write!(writer, "{}", format_employees(&employees, include_inactive))?;
    Ok(())
}

fn format_employees(employees: &[EmployeeRecord], include_inactive: bool) -> String {
    if employees.is_empty() {
        let message = if include_inactive {
            "No employees registered.\n"
        } else {
            "No active employees.\n"
        };
        return message.to_string();
    }
    let mut output = format!("{:<6}{:<24}{:<16}{}\n", "ID", "NAME", "BADGE", "STATUS");
    for employee in employees {
        let status = if employee.is_active { "active" } else { "inactive" };
        output.push_str(&format!(
            "{:<6}{:<24}{:<16}{}\n",
            employee.id, employee.full_name, employee.nfc_uid, status
        ));
    }
    output
}
