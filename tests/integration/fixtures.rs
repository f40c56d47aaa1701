//! Test fixtures for integration tests.
//!
//! Provides helpers for:
//! - Plan-backed task builders
//! - One-call harness runs
//! - Locating the compiled mill binary for worker-process tests

use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use mill::core::{Task, WorkPlan};
use mill::harness::Harness;
use mill::report::Collector;
use mill::strategy::{ProcessPoolStrategy, Strategy, StrategyKind};
use mill::RunReport;

/// A task that simulates `millis` of work split into `slices` waits.
pub fn sim_task(name: &str, millis: u64, slices: u32) -> Task {
    Task::from_plan(
        name,
        WorkPlan::sim(Duration::from_millis(millis)).with_slices(slices),
    )
}

/// A task that fails after `millis` of simulated work.
pub fn failing_task(name: &str, millis: u64, message: &str) -> Task {
    Task::from_plan(
        name,
        WorkPlan::sim(Duration::from_millis(millis)).fail_with(message),
    )
}

/// A task that would need `millis` of work but is capped at `timeout_ms`.
pub fn deadlined_task(name: &str, millis: u64, slices: u32, timeout_ms: u64) -> Task {
    Task::from_plan(
        name,
        WorkPlan::sim(Duration::from_millis(millis))
            .with_slices(slices)
            .with_timeout(Duration::from_millis(timeout_ms)),
    )
}

/// Register `tasks` and run them all under `kind`.
pub fn run_with(kind: StrategyKind, workers: usize, tasks: Vec<Task>) -> RunReport {
    let mut harness = Harness::new();
    harness
        .register_all(tasks)
        .expect("fixture task names must be unique");
    harness.run(kind, workers).expect("run failed")
}

/// Path of the compiled mill binary.
///
/// Process tests must point the pool at the real binary; inside the test
/// runner, current_exe would be the test harness itself.
pub fn mill_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mill"))
}

/// Run tasks under a process pool that spawns the real mill binary.
pub fn run_processes(workers: usize, tasks: &[Task]) -> Collector {
    let strategy = ProcessPoolStrategy::new(workers)
        .expect("valid worker count")
        .with_program(mill_binary());
    strategy
        .run(tasks, &CancellationToken::new())
        .expect("process run failed")
}
