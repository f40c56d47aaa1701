//! End-to-end tests against the compiled binary.
//!
//! These spawn the real mill executable: worker mode speaking the wire
//! protocol, the run command's exit codes, and the race command driving
//! worker processes from a real parent.

use std::process::Command;
use std::time::Duration;

use mill::core::{TaskId, WorkPlan};
use mill::worker::{parse_wire_line, WorkOrder};
use mill::RunReport;

use crate::fixtures::mill_binary;

fn run_mill(args: &[&str]) -> std::process::Output {
    Command::new(mill_binary())
        .args(args)
        .output()
        .expect("failed to spawn mill")
}

/// Test: Worker mode speaks the wire protocol
/// Given a serialized work order for a successful download
/// When the binary runs in worker mode
/// Then it exits 0 and prints exactly one parseable report line
#[test]
fn test_worker_mode_wire_roundtrip() {
    let id = TaskId::new();
    let plan = WorkPlan::sim(Duration::from_millis(10))
        .succeed_with_units(2048)
        .with_success_detail("2048 bytes");
    let order = WorkOrder::new(id, "wire-test", plan);
    let payload = serde_json::to_string(&order).unwrap();

    let output = run_mill(&["worker", "--plan", &payload]);
    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let report = parse_wire_line(&stdout).unwrap().into_report();
    assert_eq!(report.task_id, id);
    assert_eq!(report.name, "wire-test");
    assert!(report.is_success());
    assert_eq!(report.units, Some(2048));
}

/// Test: Worker mode executes counting plans
/// Given a counting work order
/// When the binary runs in worker mode
/// Then the report line carries the child's subtotal
#[test]
fn test_worker_mode_counts_locally() {
    let order = WorkOrder::new(TaskId::new(), "bump", WorkPlan::count(750));
    let payload = serde_json::to_string(&order).unwrap();

    let output = run_mill(&["worker", "--plan", &payload]);
    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let report = parse_wire_line(&stdout).unwrap().into_report();
    assert_eq!(report.units, Some(750));
}

/// Test: Worker mode rejects a garbled order
/// Given an unparseable plan argument
/// When the binary runs in worker mode
/// Then it exits 2 without printing a report line
#[test]
fn test_worker_mode_rejects_garbage() {
    let output = run_mill(&["worker", "--plan", "not json at all"]);
    assert_eq!(output.status.code(), Some(2));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(parse_wire_line(&stdout).is_err());
}

/// Test: All-success run exits 0
/// Given the first 3 suite tasks (all reliable sites)
/// When mill run executes them
/// Then the exit code is 0 and the summary line is printed
#[test]
fn test_run_all_success_exits_zero() {
    let output = run_mill(&["run", "-s", "threads", "-n", "3"]);
    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Run Complete"));
    assert!(stdout.contains("Total succeeded"));
}

/// Test: A failing task makes the run exit 1
/// Given the full suite including the flaky site
/// When mill run executes it
/// Then the exit code is 1 and the failure is visible in the table
#[test]
fn test_run_with_failure_exits_one() {
    let output = run_mill(&["run", "-s", "cooperative"]);
    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("flaky.example.net"));
    assert!(stdout.contains("connection reset by peer"));
}

/// Test: An unknown strategy is a setup error
/// Given a strategy name nothing implements
/// When mill run starts
/// Then it exits 2 with an error on stderr
#[test]
fn test_unknown_strategy_exits_two() {
    let output = run_mill(&["run", "-s", "fibers"]);
    assert_eq!(output.status.code(), Some(2));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error"));
    assert!(stderr.contains("fibers"));
}

/// Test: JSON output is a parseable run report
/// Given a 2-task run with --json
/// When mill run finishes
/// Then stdout parses as a RunReport with 2 completion-ordered reports
#[test]
fn test_run_json_output_parses() {
    let output = run_mill(&["run", "-s", "threads", "-n", "2", "--json"]);
    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let report: RunReport = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report.reports.len(), 2);
    assert!(report.all_succeeded());
}

/// Test: The race command drives real worker processes
/// Given 3 counting tasks of 200 increments under the process strategy
/// When mill race runs with --json
/// Then the aggregated count is exact and the exit code is 0
#[test]
fn test_race_processes_aggregates_exactly() {
    let output = run_mill(&[
        "race", "-s", "processes", "-n", "3", "-i", "200", "-w", "2", "--json",
    ]);
    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let outcome: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(outcome["expected"], 600);
    assert_eq!(outcome["observed"], 600);
}

/// Test: Guarded race exits 0 with an exact count
/// Given 4 guarded tasks of 500 increments on threads
/// When mill race runs with --json
/// Then observed equals expected
#[test]
fn test_race_guarded_threads_is_exact() {
    let output = run_mill(&["race", "-s", "threads", "-n", "4", "-i", "500", "--json"]);
    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let outcome: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(outcome["expected"], 2000);
    assert_eq!(outcome["observed"], 2000);
}

/// Test: Unguarded race never overshoots
/// Given an unguarded thread race
/// When mill race runs with --json
/// Then observed stays at or below expected and the exit code matches
#[test]
fn test_race_unguarded_never_overshoots() {
    let output = run_mill(&[
        "race",
        "-s",
        "threads",
        "-n",
        "8",
        "-i",
        "1000",
        "--no-guard",
        "--json",
    ]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let outcome: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let expected = outcome["expected"].as_u64().unwrap();
    let observed = outcome["observed"].as_u64().unwrap();
    assert_eq!(expected, 8000);
    assert!(observed <= expected);

    let code = output.status.code();
    if observed == expected {
        assert_eq!(code, Some(0));
    } else {
        assert_eq!(code, Some(1));
    }
}
