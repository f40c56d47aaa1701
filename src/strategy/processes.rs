//! OS process pool strategy.
//!
//! Each task is executed by re-running the current binary in hidden worker
//! mode with the task's serialized work order on the command line. The
//! child prints one JSON report line on stdout; parent and children share
//! no memory, so everything that comes back travels through that explicit
//! channel. Parallelism is bounded by the worker count and reports are
//! collected in completion order.
//!
//! The child enforces the task's own deadline and self-reports a timeout
//! through the wire line. The parent only kills a child that overruns the
//! deadline plus a grace period, so a kill means the worker itself was
//! stuck.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio::process::Command;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::core::Task;
use crate::report::{Collector, FailureKind, TaskReport};
use crate::strategy::{Strategy, StrategyKind};
use crate::worker::{self, WorkOrder};
use crate::{mlog_debug, mlog_warn, Error, Result};

/// Extra time a child gets past the task deadline before the parent
/// kills it.
const CHILD_GRACE: Duration = Duration::from_millis(250);

/// Pool of worker processes with independent address spaces.
#[derive(Debug, Clone)]
pub struct ProcessPoolStrategy {
    workers: usize,
    program: PathBuf,
}

impl ProcessPoolStrategy {
    /// Create a pool of the given width, spawning the current executable
    /// in worker mode.
    ///
    /// # Errors
    ///
    /// Returns `Error::StrategyUnavailable` for unusable worker counts and
    /// an IO error when the current executable cannot be resolved.
    pub fn new(workers: usize) -> Result<Self> {
        super::validate_workers(workers)?;
        let program = std::env::current_exe()?;
        Ok(Self { workers, program })
    }

    /// Override the binary spawned in worker mode.
    pub fn with_program(mut self, program: PathBuf) -> Self {
        self.program = program;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    async fn run_async(
        &self,
        tasks: &[Task],
        cancel: &CancellationToken,
        mut collector: Collector,
    ) -> Result<Collector> {
        let mut reports = stream::iter(tasks.iter())
            // Cancellation is checked as each task is pulled: stop
            // submitting, let in-flight children finish
            .take_while(|_| futures::future::ready(!cancel.is_cancelled()))
            .map(|task| self.execute_child(task))
            .buffer_unordered(self.workers);

        while let Some(report) = reports.next().await {
            collector.push(report);
        }
        Ok(collector)
    }

    /// Spawn one worker child and turn whatever happens into a report.
    async fn execute_child(&self, task: &Task) -> TaskReport {
        let started = Instant::now();
        let Some(plan) = task.plan() else {
            return TaskReport::failure(
                task.id(),
                task.name(),
                started.elapsed(),
                FailureKind::Execution,
                "task has no serializable plan",
            );
        };

        let order = WorkOrder::new(task.id(), task.name(), plan.clone());
        let payload = match serde_json::to_string(&order) {
            Ok(payload) => payload,
            Err(e) => {
                return TaskReport::failure(
                    task.id(),
                    task.name(),
                    started.elapsed(),
                    FailureKind::Execution,
                    format!("cannot encode work order: {}", e),
                );
            }
        };

        let mut command = Command::new(&self.program);
        command
            .arg("worker")
            .arg("--plan")
            .arg(&payload)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        mlog_debug!(
            "ProcessPoolStrategy: spawn task={} program={}",
            task.name(),
            self.program.display()
        );

        let allowance = task.timeout().map(|t| t + CHILD_GRACE);
        let output_result = match allowance {
            Some(limit) => match timeout(limit, command.output()).await {
                Ok(result) => result,
                Err(_) => {
                    mlog_warn!(
                        "ProcessPoolStrategy: killed stuck worker task={} after {:?}",
                        task.name(),
                        limit
                    );
                    return TaskReport::failure(
                        task.id(),
                        task.name(),
                        started.elapsed(),
                        FailureKind::Timeout,
                        format!("worker killed after {:?} allowance", limit),
                    );
                }
            },
            None => command.output().await,
        };

        let output = match output_result {
            Ok(output) => output,
            Err(e) => {
                return TaskReport::failure(
                    task.id(),
                    task.name(),
                    started.elapsed(),
                    FailureKind::Execution,
                    format!("failed to launch worker: {}", e),
                );
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        match worker::parse_wire_line(&stdout) {
            Ok(wire) => wire.into_report(),
            Err(e) => {
                let message = if output.status.success() {
                    format!("invalid worker output: {}", e)
                } else {
                    format!("worker exited with {} ({})", output.status, e)
                };
                TaskReport::failure(
                    task.id(),
                    task.name(),
                    started.elapsed(),
                    FailureKind::Execution,
                    message,
                )
            }
        }
    }
}

impl Strategy for ProcessPoolStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Processes
    }

    fn run(&self, tasks: &[Task], cancel: &CancellationToken) -> Result<Collector> {
        // A closure cannot cross a process boundary; refuse the whole run
        // before any child is spawned
        for task in tasks {
            if task.plan().is_none() {
                return Err(Error::StrategyUnavailable {
                    reason: format!(
                        "task '{}' has no serializable plan for process transport",
                        task.name()
                    ),
                });
            }
        }

        let collector = Collector::new();
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run_async(tasks, cancel, collector))
    }
}
