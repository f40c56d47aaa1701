//! Run harness: registered tasks in, run report out.
//!
//! The harness owns the registry and wires one run together: build the
//! requested strategy, hand it the task list, and finish the collector
//! into a [`RunReport`]. Strategies do the scheduling; the harness never
//! touches a workload itself.

use tokio_util::sync::CancellationToken;

use crate::core::Task;
use crate::registry::Registry;
use crate::report::RunReport;
use crate::strategy::StrategyKind;
use crate::{mlog, Result};

#[derive(Debug, Default)]
pub struct Harness {
    registry: Registry,
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Names must be unique within the harness.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateTask` when the name is already taken.
    pub fn register(&mut self, task: Task) -> Result<()> {
        self.registry.register(task)
    }

    /// Register a batch of tasks, stopping at the first duplicate name.
    pub fn register_all(&mut self, tasks: impl IntoIterator<Item = Task>) -> Result<()> {
        for task in tasks {
            self.registry.register(task)?;
        }
        Ok(())
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run every registered task under the given strategy.
    ///
    /// The registry is untouched by the run, so calling this again re-runs
    /// the same task set from scratch.
    pub fn run(&self, kind: StrategyKind, workers: usize) -> Result<RunReport> {
        self.run_cancellable(kind, workers, &CancellationToken::new())
    }

    /// Run with an external cancellation token.
    ///
    /// Cancellation stops task admission; work already in flight runs to
    /// completion and still reports.
    pub fn run_cancellable(
        &self,
        kind: StrategyKind,
        workers: usize,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        let strategy = kind.build(workers)?;
        mlog!(
            "Harness: run start strategy={} workers={} tasks={}",
            kind,
            workers,
            self.registry.len()
        );
        let collector = strategy.run(self.registry.tasks(), cancel)?;
        let report = collector.finish(kind);
        mlog!(
            "Harness: run done strategy={} succeeded={} failed={} elapsed={:?}",
            kind,
            report.summary.succeeded,
            report.summary.failed,
            report.summary.total_elapsed
        );
        Ok(report)
    }
}
