//! Unit-of-work model: steppable workloads and their serializable plans.
//!
//! A workload is driven by explicit pulls. Each `step()` either declares a
//! suspension point (a timed wait standing in for blocking I/O) or finishes
//! with a result. Strategies own the stepping; a workload never sleeps or
//! blocks on its own, which is what lets the cooperative scheduler interleave
//! many workloads on one thread.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Failure raised by a workload's own logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkError {
    /// Human-readable description of what went wrong.
    pub message: String,
}

impl WorkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for WorkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for WorkError {}

/// Successful completion payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkOutput {
    /// Optional human-readable result line (e.g. "5120 bytes").
    pub detail: Option<String>,
    /// Optional unit count (bytes downloaded, increments applied).
    pub units: Option<u64>,
}

impl WorkOutput {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn units(units: u64) -> Self {
        Self {
            detail: None,
            units: Some(units),
        }
    }
}

/// One scheduling decision from a workload.
#[derive(Debug)]
pub enum Step {
    /// Declared suspension point: the workload wants this much simulated
    /// wait before being stepped again.
    Wait(Duration),
    /// The workload finished, successfully or not.
    Done(std::result::Result<WorkOutput, WorkError>),
}

/// A steppable unit of work.
///
/// Implementations hold all their mutable state. The driving strategy owns
/// the workload for the duration of one execution attempt; a new attempt
/// gets a new workload.
pub trait Workload: Send {
    /// Advance to the next suspension point or to completion.
    fn step(&mut self) -> Step;
}

/// Planned terminal outcome of a simulated workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PlannedOutcome {
    /// Finish successfully with the given payload.
    Succeed {
        /// Unit count to report (bytes for the download suite).
        units: Option<u64>,
        /// Human-readable result line.
        detail: Option<String>,
    },
    /// Fail with the given message once the simulated work is over.
    Fail { message: String },
}

impl Default for PlannedOutcome {
    fn default() -> Self {
        Self::Succeed {
            units: None,
            detail: None,
        }
    }
}

/// The work a plan describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "work")]
pub enum WorkBody {
    /// Simulated blocking work: timed waits, then a planned outcome.
    Sim {
        /// Total simulated duration in milliseconds.
        duration_ms: u64,
        /// Number of suspension slices the duration is split into (min 1).
        slices: u32,
        /// What happens once the simulated work is over.
        outcome: PlannedOutcome,
    },
    /// Counting work: bump a workload-local counter `increments` times,
    /// then succeed reporting the subtotal as units. The counter lives
    /// inside the workload, so under the process strategy it is local to
    /// the worker child.
    Count {
        /// Number of increments to apply.
        increments: u64,
    },
}

/// Serializable description of a workload.
///
/// A plan fully determines the workload it builds, so the process strategy
/// can ship the plan to a worker child and rebuild identical work on the
/// other side of the process boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkPlan {
    /// The work to perform.
    pub body: WorkBody,
    /// Declared per-task deadline in milliseconds, if any.
    pub timeout_ms: Option<u64>,
}

impl WorkPlan {
    /// Plan a single-slice simulated wait that then succeeds.
    pub fn sim(duration: Duration) -> Self {
        Self {
            body: WorkBody::Sim {
                duration_ms: duration.as_millis() as u64,
                slices: 1,
                outcome: PlannedOutcome::default(),
            },
            timeout_ms: None,
        }
    }

    /// Plan counting work against a workload-local counter.
    pub fn count(increments: u64) -> Self {
        Self {
            body: WorkBody::Count { increments },
            timeout_ms: None,
        }
    }

    /// Split the simulated duration into `n` suspension points.
    /// No effect on counting plans.
    pub fn with_slices(mut self, n: u32) -> Self {
        if let WorkBody::Sim { slices, .. } = &mut self.body {
            *slices = n.max(1);
        }
        self
    }

    /// Succeed reporting the given unit count. No effect on counting plans.
    pub fn succeed_with_units(mut self, units: u64) -> Self {
        if let WorkBody::Sim { outcome, .. } = &mut self.body {
            let detail = match outcome {
                PlannedOutcome::Succeed { detail, .. } => detail.take(),
                PlannedOutcome::Fail { .. } => None,
            };
            *outcome = PlannedOutcome::Succeed {
                units: Some(units),
                detail,
            };
        }
        self
    }

    /// Attach a human-readable result line to a successful sim plan.
    pub fn with_success_detail(mut self, line: impl Into<String>) -> Self {
        if let WorkBody::Sim {
            outcome: PlannedOutcome::Succeed { detail, .. },
            ..
        } = &mut self.body
        {
            *detail = Some(line.into());
        }
        self
    }

    /// Fail with the given message after the simulated work.
    /// No effect on counting plans.
    pub fn fail_with(mut self, message: impl Into<String>) -> Self {
        if let WorkBody::Sim { outcome, .. } = &mut self.body {
            *outcome = PlannedOutcome::Fail {
                message: message.into(),
            };
        }
        self
    }

    /// Declare a per-task deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Declared deadline, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Materialize the workload this plan describes.
    pub fn build(&self) -> Box<dyn Workload> {
        match &self.body {
            WorkBody::Sim {
                duration_ms,
                slices,
                outcome,
            } => Box::new(SimWorkload::new(*duration_ms, *slices, outcome.clone())),
            WorkBody::Count { increments } => Box::new(CountWorkload::new(*increments)),
        }
    }
}

/// Workload that simulates blocking work through declared timed waits.
///
/// The simulated duration is split into `slices` equal waits, the last
/// slice absorbing any rounding remainder. Each wait is a suspension
/// point, so other workloads can run between slices.
#[derive(Debug)]
pub struct SimWorkload {
    duration_ms: u64,
    slices: u32,
    outcome: PlannedOutcome,
    issued: u32,
}

impl SimWorkload {
    pub fn new(duration_ms: u64, slices: u32, outcome: PlannedOutcome) -> Self {
        Self {
            duration_ms,
            slices: slices.max(1),
            outcome,
            issued: 0,
        }
    }

    fn slice_duration(&self, index: u32) -> Duration {
        let slices = u64::from(self.slices);
        let base = self.duration_ms / slices;
        let ms = if u64::from(index) == slices - 1 {
            // Last slice takes the rounding remainder
            self.duration_ms - base * (slices - 1)
        } else {
            base
        };
        Duration::from_millis(ms)
    }
}

impl Workload for SimWorkload {
    fn step(&mut self) -> Step {
        if self.issued < self.slices {
            let wait = self.slice_duration(self.issued);
            self.issued += 1;
            return Step::Wait(wait);
        }
        match &self.outcome {
            PlannedOutcome::Succeed { units, detail } => Step::Done(Ok(WorkOutput {
                detail: detail.clone(),
                units: *units,
            })),
            PlannedOutcome::Fail { message } => Step::Done(Err(WorkError::new(message.clone()))),
        }
    }
}

/// Workload that counts on a workload-local cell.
///
/// Declares one suspension point, then applies all increments in a single
/// burst and reports the subtotal. Because the cell belongs to the
/// workload, running this under the process strategy demonstrates that
/// worker children share no memory: each child counts from zero and the
/// parent must aggregate the reported subtotals.
#[derive(Debug)]
pub struct CountWorkload {
    goal: u64,
    applied: u64,
    yielded: bool,
}

impl CountWorkload {
    pub fn new(goal: u64) -> Self {
        Self {
            goal,
            applied: 0,
            yielded: false,
        }
    }
}

impl Workload for CountWorkload {
    fn step(&mut self) -> Step {
        if !self.yielded {
            self.yielded = true;
            return Step::Wait(Duration::ZERO);
        }
        while self.applied < self.goal {
            self.applied += 1;
        }
        Step::Done(Ok(WorkOutput {
            detail: Some(format!("{} increments", self.applied)),
            units: Some(self.applied),
        }))
    }
}

/// Workload wrapping a one-shot closure.
///
/// Steps exactly once, finishing with the closure's result. Having no
/// declared suspension points, it cannot be interleaved mid-work or
/// shipped to a worker process.
pub struct FnWorkload {
    func: Option<Box<dyn FnOnce() -> std::result::Result<WorkOutput, WorkError> + Send>>,
}

impl FnWorkload {
    pub fn new<F>(func: F) -> Self
    where
        F: FnOnce() -> std::result::Result<WorkOutput, WorkError> + Send + 'static,
    {
        Self {
            func: Some(Box::new(func)),
        }
    }
}

impl Workload for FnWorkload {
    fn step(&mut self) -> Step {
        match self.func.take() {
            Some(f) => Step::Done(f()),
            None => Step::Done(Err(WorkError::new("workload already consumed"))),
        }
    }
}

impl std::fmt::Debug for FnWorkload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnWorkload")
            .field("consumed", &self.func.is_none())
            .finish()
    }
}
