//! Fixed-width OS thread pool strategy.
//!
//! Tasks are fanned out to `workers` threads over a crossbeam channel and
//! finished reports come back over a second channel, which makes the
//! collector's order true completion order. One task failing, timing out,
//! or panicking never takes down its worker or its siblings: the worker
//! catches the unwind, reports it, and moves to the next task.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread;

use crossbeam_channel::unbounded;
use tokio_util::sync::CancellationToken;

use crate::core::Task;
use crate::report::{Collector, FailureKind, TaskReport};
use crate::strategy::{drive, panic_message, Strategy, StrategyKind};
use crate::{mlog_debug, Error, Result};

/// Pool of OS threads sharing the caller's memory space.
#[derive(Debug, Clone)]
pub struct ThreadPoolStrategy {
    workers: usize,
}

impl ThreadPoolStrategy {
    /// Create a pool of the given width.
    ///
    /// # Errors
    ///
    /// Returns `Error::StrategyUnavailable` if `workers` is zero or
    /// exceeds [`super::MAX_WORKERS`].
    pub fn new(workers: usize) -> Result<Self> {
        super::validate_workers(workers)?;
        Ok(Self { workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Strategy for ThreadPoolStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Threads
    }

    fn run(&self, tasks: &[Task], cancel: &CancellationToken) -> Result<Collector> {
        let mut collector = Collector::new();
        let (work_tx, work_rx) = unbounded::<Task>();
        let (report_tx, report_rx) = unbounded::<TaskReport>();

        let mut handles = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            let work_rx = work_rx.clone();
            let report_tx = report_tx.clone();
            handles.push(thread::spawn(move || {
                while let Ok(task) = work_rx.recv() {
                    mlog_debug!("worker-{}: start task={}", worker_id, task.name());
                    let report = execute_task(&task);
                    if report_tx.send(report).is_err() {
                        break;
                    }
                }
            }));
        }
        drop(work_rx);
        drop(report_tx);

        // Submission stops at cancellation; in-flight tasks drain normally
        let mut submitted = 0;
        for task in tasks {
            if cancel.is_cancelled() {
                mlog_debug!(
                    "ThreadPoolStrategy: cancelled, {} of {} submitted",
                    submitted,
                    tasks.len()
                );
                break;
            }
            work_tx
                .send(task.clone())
                .map_err(|_| Error::TaskJoin("worker pool disconnected".to_string()))?;
            submitted += 1;
        }
        drop(work_tx);

        for _ in 0..submitted {
            match report_rx.recv() {
                Ok(report) => collector.push(report),
                Err(_) => break,
            }
        }

        for handle in handles {
            handle
                .join()
                .map_err(|_| Error::TaskJoin("worker thread panicked".to_string()))?;
        }

        Ok(collector)
    }
}

/// Run one task on the current worker thread, catching panics.
fn execute_task(task: &Task) -> TaskReport {
    let started = std::time::Instant::now();
    let result = catch_unwind(AssertUnwindSafe(|| {
        drive(task.id(), task.name(), task.fresh_workload(), task.timeout())
    }));
    match result {
        Ok(report) => report,
        Err(payload) => TaskReport::failure(
            task.id(),
            task.name(),
            started.elapsed(),
            FailureKind::Panic,
            panic_message(payload),
        ),
    }
}
