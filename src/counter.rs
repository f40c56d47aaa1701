//! Shared-counter race demonstration.
//!
//! A batch of tasks each increment one counter `n` times. With the guard
//! on, every increment lands and the final value is exact. With the guard
//! off under threads, the two-step read/write leaves a window where a
//! concurrent increment is overwritten, so updates go missing while the
//! counter itself stays well defined. Under the process pool each child
//! counts in its own memory and reports its tally over the wire, so the
//! aggregate is exact whether or not the guard is requested.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::core::{Task, WorkOutput, WorkPlan};
use crate::strategy::StrategyKind;
use crate::{Error, Result};

/// Counter shared by every task in a race run.
///
/// The atomic makes the unguarded path a data race in effect but not in
/// the language: reads and writes stay tear-free, only increments get
/// lost.
#[derive(Debug, Default)]
pub struct SharedCounter {
    value: AtomicU64,
    guard: Mutex<()>,
}

impl SharedCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one. Guarded bumps hold the mutex across the read and the
    /// write; unguarded bumps leave a window between them in which a
    /// concurrent bump is overwritten.
    pub fn bump(&self, guarded: bool) {
        if guarded {
            let _held = self
                .guard
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let current = self.value.load(Ordering::SeqCst);
            self.value.store(current + 1, Ordering::SeqCst);
        } else {
            let current = self.value.load(Ordering::SeqCst);
            // Widen the read/write window so interleavings show up even
            // on fast machines
            std::thread::yield_now();
            self.value.store(current + 1, Ordering::SeqCst);
        }
    }

    pub fn value(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.value.store(0, Ordering::SeqCst);
    }
}

/// What a race run produced versus what serial arithmetic predicts.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RaceOutcome {
    pub expected: u64,
    pub observed: u64,
}

impl RaceOutcome {
    /// True when at least one increment went missing.
    pub fn lossy(&self) -> bool {
        self.observed < self.expected
    }

    /// Number of increments that went missing.
    pub fn lost(&self) -> u64 {
        self.expected.saturating_sub(self.observed)
    }
}

/// Run `tasks` tasks that each increment a shared counter `increments`
/// times under the given strategy, and report expected versus observed.
///
/// Thread and cooperative runs share one in-memory counter. Process runs
/// give every child its own counter and sum the tallies the children
/// report, so the guard flag has no effect there.
pub fn increment_n_times(
    kind: StrategyKind,
    tasks: usize,
    increments: u64,
    use_guard: bool,
    workers: usize,
) -> Result<RaceOutcome> {
    let expected = (tasks as u64).checked_mul(increments).ok_or_else(|| {
        Error::StrategyUnavailable {
            reason: format!(
                "{} tasks x {} increments overflows the expected count",
                tasks, increments
            ),
        }
    })?;
    let strategy = kind.build(workers)?;
    let cancel = CancellationToken::new();

    match kind {
        StrategyKind::Processes => {
            let work: Vec<Task> = (0..tasks)
                .map(|i| Task::from_plan(&format!("bump-{:02}", i), WorkPlan::count(increments)))
                .collect();
            let collector = strategy.run(&work, &cancel)?;
            let observed = collector.reports().iter().filter_map(|r| r.units).sum();
            Ok(RaceOutcome { expected, observed })
        }
        StrategyKind::Cooperative | StrategyKind::Threads => {
            let counter = Arc::new(SharedCounter::new());
            let work: Vec<Task> = (0..tasks)
                .map(|i| {
                    let counter = Arc::clone(&counter);
                    Task::from_fn(&format!("bump-{:02}", i), move || {
                        for _ in 0..increments {
                            counter.bump(use_guard);
                        }
                        Ok(WorkOutput::units(increments))
                    })
                })
                .collect();
            strategy.run(&work, &cancel)?;
            Ok(RaceOutcome {
                expected,
                observed: counter.value(),
            })
        }
    }
}
