//! End-to-end tests driving the `wt` binary against a temporary database.
//!
//! Covers: employee add → punch → stats → events → import → daily → clear-day
//! → audit.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn wt_binary() -> String {
    env!("CARGO_BIN_EXE_wt").to_string()
}

fn wt(temp: &Path) -> Command {
    let mut cmd = Command::new(wt_binary());
    cmd.env("HOME", temp)
        .env("XDG_CONFIG_HOME", temp.join(".config"))
        .env("XDG_DATA_HOME", temp.join(".local/share"))
        .env("WT_DATABASE_PATH", temp.join("data/wt.db"))
        .env("WT_TIMEZONE", "Europe/Warsaw")
        .env_remove("RUST_LOG");
    cmd
}

fn run_ok(cmd: &mut Command) -> String {
    let output = cmd.output().expect("failed to run wt");
    assert!(
        output.status.success(),
        "wt should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

fn run_with_stdin(cmd: &mut Command, input: &str) -> Output {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn wt");
    child.stdin.take().unwrap().write_all(input.as_bytes()).unwrap();
    child.wait_with_output().unwrap()
}

fn json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout).expect("stdout should be JSON")
}

#[test]
fn test_punch_and_report_flow() {
    let temp = TempDir::new().unwrap();

    let added = run_ok(wt(temp.path()).args([
        "employee",
        "add",
        "--name",
        "Anna Kowalska",
        "--uid",
        "04:A2",
    ]));
    assert_eq!(added, "Added employee 1 (Anna Kowalska)\n");

    let punched_in = run_ok(wt(temp.path()).args([
        "punch",
        "--uid",
        "04:A2",
        "--at",
        "2025-03-10 08:00",
        "--comment",
        "terminal offline",
    ]));
    assert!(punched_in.starts_with("IN recorded for Anna Kowalska (1)"), "{punched_in}");
    let punched_out = run_ok(wt(temp.path()).args([
        "punch",
        "--employee",
        "1",
        "--at",
        "2025-03-10T15:30:00Z",
        "--comment",
        "terminal offline",
    ]));
    assert!(punched_out.starts_with("OUT recorded"), "{punched_out}");

    let stats = json(&run_ok(
        wt(temp.path()).args(["--now", "2025-03-11T12:00:00Z", "stats", "1", "--json"]),
    ));
    assert_eq!(stats["total_seconds"], 8 * 3600 + 1800);
    assert_eq!(stats["total_hms"], "08:30:00");
    assert_eq!(stats["has_open_shift"], false);
    assert_eq!(stats["intervals"].as_array().unwrap().len(), 1);
    assert_eq!(stats["events"][0]["id"], 1);
    assert_eq!(stats["events"][0]["ts_local"], "2025-03-10T08:00:00+01:00");
    assert_eq!(stats["events"][1]["ts_utc"], "2025-03-10T15:30:00Z");

    let day = json(&run_ok(wt(temp.path()).args(["events", "day", "1", "2025-03-10", "--json"])));
    let day = day.as_array().unwrap();
    assert_eq!(day.len(), 2);
    assert!(day.iter().all(|event| event["is_manual"] == true));
    assert_eq!(day[0]["comment"], "terminal offline");

    // Import a second day that is still open at "now".
    let output = run_with_stdin(
        wt(temp.path()).arg("import"),
        "{\"employee_id\":1,\"direction\":\"IN\",\"ts\":\"2025-03-11T07:00:00Z\"}\n",
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "Imported 1 events\n");

    let daily = json(&run_ok(wt(temp.path()).args([
        "--now",
        "2025-03-11T12:00:00Z",
        "daily",
        "1",
        "--from",
        "2025-03-10",
        "--to",
        "2025-03-12",
        "--json",
    ])));
    let items = daily["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["worked_seconds"], 30_600);
    assert_eq!(items[0]["last_out_local"], "2025-03-10T16:30:00+01:00");
    assert_eq!(items[1]["worked_seconds"], 5 * 3600);
    assert_eq!(items[1]["open_shift"], true);
    assert_eq!(items[1]["last_out_local"], serde_json::Value::Null);
    assert_eq!(items[2]["worked_seconds"], 0);
    assert_eq!(daily["weeks"][0]["iso_week"], "2025-W11");
    assert_eq!(daily["total_hms"], "13:30:00");

    let cleared = run_ok(wt(temp.path()).args(["clear-day", "1", "2025-03-11"]));
    assert_eq!(cleared, "Deleted 1 events for employee 1 on 2025-03-11\n");

    let audit = json(&run_ok(wt(temp.path()).args(["audit", "--json"])));
    let actions: Vec<&str> = audit
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["action"].as_str().unwrap())
        .collect();
    assert_eq!(
        actions,
        vec![
            "clear_day_events",
            "events_import",
            "manual_event_create",
            "manual_event_create",
            "employee_create",
        ]
    );
}

#[test]
fn test_stats_without_events_fails() {
    let temp = TempDir::new().unwrap();
    run_ok(wt(temp.path()).args(["employee", "add", "--name", "Jan Nowak", "--uid", "04:B7"]));

    let output = wt(temp.path()).args(["stats", "1"]).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No events for employee 1"));
}

#[test]
fn test_deactivated_employee_cannot_punch() {
    let temp = TempDir::new().unwrap();
    run_ok(wt(temp.path()).args(["employee", "add", "--name", "Jan Nowak", "--uid", "04:B7"]));
    run_ok(wt(temp.path()).args(["employee", "deactivate", "1"]));

    let output = wt(temp.path()).args(["punch", "--uid", "04:B7"]).output().unwrap();
    assert!(!output.status.success());

    let listed = run_ok(wt(temp.path()).args(["employee", "list"]));
    assert_eq!(listed, "No active employees.\n");
}

#[test]
fn test_manual_events_can_be_deleted_but_swipes_cannot() {
    let temp = TempDir::new().unwrap();
    run_ok(wt(temp.path()).args(["employee", "add", "--name", "Jan Nowak", "--uid", "04:B7"]));
    run_ok(wt(temp.path()).args(["--now", "2025-03-10T07:00:00Z", "punch", "--uid", "04:B7"]));
    run_ok(wt(temp.path()).args([
        "punch",
        "--uid",
        "04:B7",
        "--at",
        "2025-03-10 16:00",
        "--comment",
        "left without swiping",
    ]));

    let without_comment = wt(temp.path())
        .args(["punch", "--uid", "04:B7", "--at", "2025-03-10 17:00"])
        .output()
        .unwrap();
    assert!(!without_comment.status.success());

    let manual = run_ok(wt(temp.path()).args(["events", "manual"]));
    assert_eq!(manual, "2     2025-03-10 16:00  OUT Jan Nowak           left without swiping\n");

    let refused = wt(temp.path()).args(["events", "delete", "1"]).output().unwrap();
    assert!(!refused.status.success());
    assert!(String::from_utf8_lossy(&refused.stderr).contains("only manual events can be deleted"));

    let deleted = run_ok(wt(temp.path()).args(["events", "delete", "2"]));
    assert_eq!(deleted, "Deleted manual event 2 (OUT at 2025-03-10 16:00) for employee 1\n");
    assert_eq!(run_ok(wt(temp.path()).args(["events", "manual"])), "No manual events.\n");

    let audit = json(&run_ok(wt(temp.path()).args(["audit", "--json", "--limit", "1"])));
    assert_eq!(audit[0]["action"], "manual_event_delete");
    assert_eq!(audit[0]["details"]["event_id"], 2);
}

#[test]
fn test_no_command_prints_help() {
    let temp = TempDir::new().unwrap();
    let stdout = run_ok(&mut wt(temp.path()));
    assert!(stdout.contains("Usage:"));
}
