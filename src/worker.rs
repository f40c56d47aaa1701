//! Worker mode: the child half of the process pool.
//!
//! `mill worker --plan <json>` executes exactly one work order and prints a
//! single JSON report line on stdout. The parent parses that line; nothing
//! else in worker mode may write to stdout. Diagnostics go to the shared
//! log file instead.

use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use crate::core::{TaskId, WorkPlan};
use crate::report::{FailureKind, TaskOutcome, TaskReport};
use crate::strategy::{drive, panic_message};
use crate::{mlog_debug, mlog_error, Error, Result};

/// One task shipped to a worker child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrder {
    /// Task identifier, assigned by the parent.
    pub id: TaskId,
    /// Task name, echoed back in the wire report.
    pub name: String,
    /// The work to perform.
    pub plan: WorkPlan,
}

impl WorkOrder {
    pub fn new(id: TaskId, name: &str, plan: WorkPlan) -> Self {
        Self {
            id,
            name: name.to_string(),
            plan,
        }
    }
}

/// Wire form of a task report: one JSON line on worker stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireReport {
    pub id: TaskId,
    pub name: String,
    pub outcome: TaskOutcome,
    pub elapsed_ms: u64,
    pub units: Option<u64>,
}

impl WireReport {
    pub fn from_report(report: &TaskReport) -> Self {
        Self {
            id: report.task_id,
            name: report.name.clone(),
            outcome: report.outcome.clone(),
            elapsed_ms: report.elapsed.as_millis() as u64,
            units: report.units,
        }
    }

    pub fn into_report(self) -> TaskReport {
        TaskReport {
            task_id: self.id,
            name: self.name,
            outcome: self.outcome,
            elapsed: Duration::from_millis(self.elapsed_ms),
            units: self.units,
        }
    }
}

/// Extract the report line from a worker child's stdout.
///
/// # Errors
///
/// Returns `Error::WorkerProtocol` when stdout holds no report line, or a
/// JSON error when the line does not parse.
pub fn parse_wire_line(stdout: &str) -> Result<WireReport> {
    let line = stdout
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| Error::WorkerProtocol("no report line on worker stdout".to_string()))?;
    Ok(serde_json::from_str(line)?)
}

/// Child-process entry: run one order, print one wire line.
///
/// Returns the process exit code: 0 whenever a report was produced (the
/// report itself carries success or failure), 2 on protocol failure.
pub fn run_worker(order_json: &str) -> i32 {
    crate::log::init_worker();
    let order: WorkOrder = match serde_json::from_str(order_json) {
        Ok(order) => order,
        Err(e) => {
            mlog_error!("worker: unparseable work order: {}", e);
            return 2;
        }
    };
    mlog_debug!("worker: start name={} id={}", order.name, order.id.short());
    let report = execute_order(&order);
    match serde_json::to_string(&WireReport::from_report(&report)) {
        Ok(line) => {
            println!("{}", line);
            0
        }
        Err(e) => {
            mlog_error!("worker: cannot serialize report: {}", e);
            2
        }
    }
}

/// Run the order's workload under the plan's own deadline, catching panics
/// so the parent still receives a well-formed wire line.
fn execute_order(order: &WorkOrder) -> TaskReport {
    let started = std::time::Instant::now();
    let result = catch_unwind(AssertUnwindSafe(|| {
        drive(
            order.id,
            &order.name,
            order.plan.build(),
            order.plan.timeout(),
        )
    }));
    match result {
        Ok(report) => report,
        Err(payload) => TaskReport::failure(
            order.id,
            &order.name,
            started.elapsed(),
            FailureKind::Panic,
            panic_message(payload),
        ),
    }
}
