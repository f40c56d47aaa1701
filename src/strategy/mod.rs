//! Execution strategies: interchangeable policies for running a task set.
//!
//! All strategies implement the same contract: take the registered tasks,
//! execute every one of them, and return a collector holding one report per
//! executed task in completion order. A task failing, timing out, or
//! panicking is recorded in its report and never aborts the batch; only
//! setup problems (bad worker counts, untransportable tasks) surface as
//! errors.

pub mod cooperative;
pub mod processes;
pub mod threads;

pub use cooperative::CooperativeStrategy;
pub use processes::ProcessPoolStrategy;
pub use threads::ThreadPoolStrategy;

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::core::{Step, Task, TaskId, Workload};
use crate::report::{Collector, FailureKind, TaskReport};
use crate::{Error, Result};

/// Pool width used when the caller does not specify one.
pub const DEFAULT_WORKERS: usize = 4;

/// Largest pool width a strategy will accept.
pub const MAX_WORKERS: usize = 64;

/// An interchangeable execution policy.
pub trait Strategy: Send {
    /// Which variant this is.
    fn kind(&self) -> StrategyKind;

    /// Execute the tasks, producing one report per executed task in
    /// completion order.
    ///
    /// Cancelling the token stops further tasks from being submitted;
    /// work already in flight is drained, not terminated.
    ///
    /// # Errors
    ///
    /// Only setup-time failures are returned as errors. Per-task failures
    /// become Failed reports inside the collector.
    fn run(&self, tasks: &[Task], cancel: &CancellationToken) -> Result<Collector>;
}

/// The closed set of strategy variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Single thread, cooperative scheduling at declared yield points.
    Cooperative,
    /// Fixed-width OS thread pool sharing one memory space.
    Threads,
    /// Fixed-width OS process pool with independent memory.
    Processes,
}

impl StrategyKind {
    /// Construct the strategy this kind names.
    ///
    /// `workers` applies to the pool variants and is validated there; the
    /// cooperative strategy ignores it.
    pub fn build(self, workers: usize) -> Result<Box<dyn Strategy>> {
        match self {
            StrategyKind::Cooperative => Ok(Box::new(CooperativeStrategy::new())),
            StrategyKind::Threads => Ok(Box::new(ThreadPoolStrategy::new(workers)?)),
            StrategyKind::Processes => Ok(Box::new(ProcessPoolStrategy::new(workers)?)),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Cooperative => write!(f, "cooperative"),
            StrategyKind::Threads => write!(f, "threads"),
            StrategyKind::Processes => write!(f, "processes"),
        }
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cooperative" => Ok(StrategyKind::Cooperative),
            "threads" => Ok(StrategyKind::Threads),
            "processes" => Ok(StrategyKind::Processes),
            other => Err(Error::StrategyUnavailable {
                reason: format!(
                    "unknown strategy '{}' (expected cooperative, threads, or processes)",
                    other
                ),
            }),
        }
    }
}

/// Reject pool widths the strategies cannot honor.
fn validate_workers(workers: usize) -> Result<()> {
    if workers == 0 {
        return Err(Error::StrategyUnavailable {
            reason: "worker count must be at least 1".to_string(),
        });
    }
    if workers > MAX_WORKERS {
        return Err(Error::StrategyUnavailable {
            reason: format!("worker count {} exceeds supported maximum {}", workers, MAX_WORKERS),
        });
    }
    Ok(())
}

/// Run one workload to completion on the current thread.
///
/// Declared waits become real sleeps, capped at the task's deadline. The
/// deadline is checked at every suspension point and once more when the
/// workload finishes, so work that never yields is still marked as timed
/// out after the fact.
pub(crate) fn drive(
    task_id: TaskId,
    name: &str,
    mut workload: Box<dyn Workload>,
    timeout: Option<Duration>,
) -> TaskReport {
    let started = Instant::now();
    let deadline = timeout.map(|t| started + t);

    loop {
        if deadline_passed(deadline) {
            return timeout_report(task_id, name, started, timeout);
        }
        match workload.step() {
            Step::Wait(wait) => {
                let sleep_for = match deadline {
                    Some(d) => wait.min(d.saturating_duration_since(Instant::now())),
                    None => wait,
                };
                if !sleep_for.is_zero() {
                    std::thread::sleep(sleep_for);
                }
            }
            Step::Done(Ok(output)) => {
                if deadline_passed(deadline) {
                    return timeout_report(task_id, name, started, timeout);
                }
                return TaskReport::success(task_id, name, started.elapsed(), output);
            }
            Step::Done(Err(e)) => {
                return TaskReport::failure(
                    task_id,
                    name,
                    started.elapsed(),
                    FailureKind::Execution,
                    e.message,
                );
            }
        }
    }
}

fn deadline_passed(deadline: Option<Instant>) -> bool {
    matches!(deadline, Some(d) if Instant::now() >= d)
}

fn timeout_report(
    task_id: TaskId,
    name: &str,
    started: Instant,
    timeout: Option<Duration>,
) -> TaskReport {
    TaskReport::failure(
        task_id,
        name,
        started.elapsed(),
        FailureKind::Timeout,
        format!(
            "exceeded declared timeout of {:?}",
            timeout.unwrap_or_default()
        ),
    )
}

/// Best-effort text from a panic payload.
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}
