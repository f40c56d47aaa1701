//! Execution reports and their completion-ordered collector.
//!
//! Strategies create one [`TaskReport`] per executed task and push it to a
//! [`Collector`] the moment the task finishes. The collector therefore
//! stores reports in completion order, not submission order, which is an
//! observable property distinguishing strategies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::core::{TaskId, WorkOutput};
use crate::mlog_debug;
use crate::strategy::StrategyKind;

/// Unique identifier for one harness run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return first 8 characters of the UUID for display.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classification of a failed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The task's own work failed.
    Execution,
    /// The task exceeded its declared deadline.
    Timeout,
    /// The task panicked inside a pool worker.
    Panic,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Execution => write!(f, "execution"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Panic => write!(f, "panic"),
        }
    }
}

/// Terminal outcome of one task execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum TaskOutcome {
    /// Task completed successfully.
    Success {
        /// Optional human-readable result line (e.g. "5120 bytes").
        detail: Option<String>,
    },
    /// Task failed. The run continues; the failure stays isolated here.
    Failed {
        /// What class of failure this was.
        kind: FailureKind,
        /// Message describing the failure.
        message: String,
    },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            TaskOutcome::Failed {
                kind: FailureKind::Timeout,
                ..
            }
        )
    }
}

impl std::fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskOutcome::Success { detail: None } => write!(f, "success"),
            TaskOutcome::Success {
                detail: Some(detail),
            } => write!(f, "success: {}", detail),
            TaskOutcome::Failed { kind, message } => {
                write!(f, "failed ({}): {}", kind, message)
            }
        }
    }
}

/// The recorded outcome of one task's execution.
///
/// Created by a strategy when the task finishes; owned exclusively by the
/// collector; read-only after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReport {
    /// Identifier of the task this report describes.
    pub task_id: TaskId,
    /// Name of the task, for human-readable output.
    pub name: String,
    /// How the task ended.
    pub outcome: TaskOutcome,
    /// Wall-clock time the task spent executing.
    pub elapsed: Duration,
    /// Strategy-local unit count (bytes downloaded, increments applied).
    /// The process strategy aggregates counter subtotals through this.
    pub units: Option<u64>,
}

impl TaskReport {
    pub fn success(task_id: TaskId, name: &str, elapsed: Duration, output: WorkOutput) -> Self {
        Self {
            task_id,
            name: name.to_string(),
            outcome: TaskOutcome::Success {
                detail: output.detail,
            },
            elapsed,
            units: output.units,
        }
    }

    pub fn failure(
        task_id: TaskId,
        name: &str,
        elapsed: Duration,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            task_id,
            name: name.to_string(),
            outcome: TaskOutcome::Failed {
                kind,
                message: message.into(),
            },
            elapsed,
            units: None,
        }
    }

    pub fn with_units(mut self, units: u64) -> Self {
        self.units = Some(units);
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Counts and timing for a finished (or in-progress) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of tasks that succeeded.
    pub succeeded: usize,
    /// Number of tasks that failed or timed out.
    pub failed: usize,
    /// Total wall-clock time of the run.
    pub total_elapsed: Duration,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Completion-ordered accumulator of task reports.
///
/// Total elapsed is wall-clock measured from collector construction, so a
/// strategy should create the collector when its run starts.
#[derive(Debug)]
pub struct Collector {
    reports: Vec<TaskReport>,
    started: Instant,
    started_at: DateTime<Utc>,
}

impl Collector {
    pub fn new() -> Self {
        Self {
            reports: Vec::new(),
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Record a finished task. Reports stay in push order.
    pub fn push(&mut self, report: TaskReport) {
        mlog_debug!(
            "Collector::push name={} outcome={} elapsed={:?}",
            report.name,
            report.outcome,
            report.elapsed
        );
        self.reports.push(report);
    }

    /// Reports in completion order.
    pub fn reports(&self) -> &[TaskReport] {
        &self.reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// When the collector (and thus the run) started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Counts of succeeded/failed plus wall-clock elapsed so far.
    pub fn summary(&self) -> RunSummary {
        let succeeded = self.reports.iter().filter(|r| r.is_success()).count();
        RunSummary {
            succeeded,
            failed: self.reports.len() - succeeded,
            total_elapsed: self.started.elapsed(),
        }
    }

    /// Consume the collector into a full run report.
    pub fn finish(self, strategy: StrategyKind) -> RunReport {
        let summary = self.summary();
        RunReport {
            run_id: RunId::new(),
            strategy,
            started_at: self.started_at,
            reports: self.reports,
            summary,
        }
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

/// Full record of one harness run, serializable for `--json` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Identifier of this run.
    pub run_id: RunId,
    /// Strategy the run executed under.
    pub strategy: StrategyKind,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Per-task reports in completion order.
    pub reports: Vec<TaskReport>,
    /// Aggregate counts and timing.
    pub summary: RunSummary,
}

impl RunReport {
    /// Exit-status policy: true only if every task succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.summary.all_succeeded()
    }
}
