//! Shared-counter race demonstration tests.
//!
//! These tests pin down the contract of the counter demo: guarded
//! increments are exact everywhere, unguarded increments under threads
//! are lossy but never exceed the serial prediction, and process
//! children count in genuinely independent memory.

use mill::core::{Task, WorkPlan};
use mill::counter::increment_n_times;
use mill::strategy::StrategyKind;

use crate::fixtures::run_processes;

/// Test: Guarded counting is exact on one thread
/// Given 4 tasks of 2000 guarded increments
/// When the cooperative strategy runs them
/// Then the counter lands exactly on 8000
#[test]
fn test_guarded_count_exact_under_cooperative() {
    let outcome = increment_n_times(StrategyKind::Cooperative, 4, 2000, true, 1).unwrap();
    assert_eq!(outcome.expected, 8000);
    assert_eq!(outcome.observed, 8000);
    assert!(!outcome.lossy());
}

/// Test: Guarded counting is exact under real parallelism
/// Given 4 tasks of 2000 guarded increments
/// When the thread pool runs them on 4 workers
/// Then the counter lands exactly on 8000
#[test]
fn test_guarded_count_exact_under_threads() {
    let outcome = increment_n_times(StrategyKind::Threads, 4, 2000, true, 4).unwrap();
    assert_eq!(outcome.observed, 8000, "guarded increments must all land");
    assert!(!outcome.lossy());
}

/// Test: Unguarded counting under threads is observably racy
/// Given repeated unguarded runs on 4 workers
/// When the final counts are compared with the serial prediction
/// Then no run ever exceeds it and at least one run falls short
#[test]
fn test_unguarded_threads_lose_updates() {
    let mut saw_loss = false;
    for _ in 0..20 {
        let outcome = increment_n_times(StrategyKind::Threads, 8, 2000, false, 4).unwrap();
        assert!(
            outcome.observed <= outcome.expected,
            "observed {} exceeded expected {}",
            outcome.observed,
            outcome.expected
        );
        if outcome.lossy() {
            saw_loss = true;
            break;
        }
    }
    assert!(
        saw_loss,
        "20 unguarded parallel runs never lost an update; the race window is gone"
    );
}

/// Test: Unguarded counting stays exact without parallelism
/// Given unguarded increments on the cooperative scheduler
/// When the run finishes
/// Then nothing is lost, because only one task body runs at a time
#[test]
fn test_unguarded_cooperative_stays_exact() {
    let outcome = increment_n_times(StrategyKind::Cooperative, 6, 1000, false, 1).unwrap();
    assert_eq!(outcome.observed, 6000);
    assert!(!outcome.lossy());
}

/// Test: Process children count in independent memory
/// Given 3 counting tasks of 500 increments each
/// When the process pool runs them through the real binary
/// Then each child reports its own 500 and the aggregate is their sum
#[test]
fn test_process_children_count_independently() {
    let tasks: Vec<Task> = (0..3)
        .map(|i| Task::from_plan(&format!("bump-{}", i), WorkPlan::count(500)))
        .collect();

    let collector = run_processes(2, &tasks);
    assert_eq!(collector.summary().succeeded, 3);

    for report in collector.reports() {
        assert_eq!(
            report.units,
            Some(500),
            "each child counts from zero in its own memory"
        );
    }
    let total: u64 = collector.reports().iter().filter_map(|r| r.units).sum();
    assert_eq!(total, 1500);
}
