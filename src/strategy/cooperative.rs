//! Cooperative single-thread strategy.
//!
//! One logical thread of control steps every workload in turn. A declared
//! wait parks the workload on a wake-time queue while other ready workloads
//! run, so simulated waits overlap in wall-clock time even though nothing
//! executes in parallel. Completion order follows the scheduler queue, not
//! registration order, and is deterministic for a fixed set of plans.
//!
//! Deadlines are enforced at suspension points only: a workload that never
//! yields cannot be preempted and is marked timed out when it finally
//! returns.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::core::{Step, Task, Workload};
use crate::report::{Collector, FailureKind, TaskReport};
use crate::strategy::{panic_message, Strategy, StrategyKind};
use crate::{mlog_debug, mlog_trace, Result};

/// One admitted task mid-execution.
struct Entry {
    index: usize,
    workload: Box<dyn Workload>,
    started: Instant,
    deadline: Option<Instant>,
}

/// A parked entry waiting for its wake time.
struct Sleeper {
    wake_at: Instant,
    seq: u64,
    entry: Entry,
}

impl PartialEq for Sleeper {
    fn eq(&self, other: &Self) -> bool {
        self.wake_at == other.wake_at && self.seq == other.seq
    }
}

impl Eq for Sleeper {}

impl PartialOrd for Sleeper {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Sleeper {
    // Reversed so the BinaryHeap pops the earliest wake time; sequence
    // number breaks ties in park order.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .wake_at
            .cmp(&self.wake_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Single-threaded scheduler driving all tasks at declared yield points.
#[derive(Debug, Default)]
pub struct CooperativeStrategy;

impl CooperativeStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for CooperativeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Cooperative
    }

    fn run(&self, tasks: &[Task], cancel: &CancellationToken) -> Result<Collector> {
        let mut collector = Collector::new();
        let mut ready: VecDeque<Entry> = VecDeque::new();
        let mut sleeping: BinaryHeap<Sleeper> = BinaryHeap::new();
        let mut seq: u64 = 0;

        // Admission happens up front; a cancelled token stops it. Work
        // admitted before cancellation is drained, never terminated.
        for (index, task) in tasks.iter().enumerate() {
            if cancel.is_cancelled() {
                mlog_debug!(
                    "CooperativeStrategy: cancelled during admission, {} of {} admitted",
                    index,
                    tasks.len()
                );
                break;
            }
            let started = Instant::now();
            ready.push_back(Entry {
                index,
                workload: task.fresh_workload(),
                started,
                deadline: task.timeout().map(|t| started + t),
            });
        }
        mlog_debug!(
            "CooperativeStrategy::run admitted={} tasks",
            ready.len()
        );

        loop {
            while let Some(entry) = ready.pop_front() {
                match self.step_entry(entry, tasks) {
                    Disposition::Finished(report) => collector.push(report),
                    Disposition::Parked(entry, wake_at) => {
                        seq += 1;
                        sleeping.push(Sleeper {
                            wake_at,
                            seq,
                            entry,
                        });
                    }
                }
            }

            // Nothing ready: advance to the earliest waker
            let Some(sleeper) = sleeping.pop() else {
                break;
            };
            let now = Instant::now();
            if sleeper.wake_at > now {
                std::thread::sleep(sleeper.wake_at - now);
            }
            ready.push_back(sleeper.entry);

            // Wake everything else that is due, preserving park order
            loop {
                let due = matches!(sleeping.peek(), Some(next) if next.wake_at <= Instant::now());
                if !due {
                    break;
                }
                if let Some(next) = sleeping.pop() {
                    ready.push_back(next.entry);
                }
            }
        }

        Ok(collector)
    }
}

enum Disposition {
    Finished(TaskReport),
    Parked(Entry, Instant),
}

impl CooperativeStrategy {
    fn step_entry(&self, mut entry: Entry, tasks: &[Task]) -> Disposition {
        let task = &tasks[entry.index];
        let stepped = catch_unwind(AssertUnwindSafe(|| entry.workload.step()));
        let step = match stepped {
            Ok(step) => step,
            Err(payload) => {
                return Disposition::Finished(TaskReport::failure(
                    task.id(),
                    task.name(),
                    entry.started.elapsed(),
                    FailureKind::Panic,
                    panic_message(payload),
                ));
            }
        };

        match step {
            Step::Wait(wait) => {
                let now = Instant::now();
                if let Some(deadline) = entry.deadline {
                    if now >= deadline {
                        return Disposition::Finished(self.timeout_report(task, &entry));
                    }
                }
                mlog_trace!(
                    "CooperativeStrategy: park task={} wait={:?}",
                    task.name(),
                    wait
                );
                let mut wake_at = now + wait;
                if let Some(deadline) = entry.deadline {
                    // Wake no later than the deadline so the overrun is
                    // reported promptly
                    wake_at = wake_at.min(deadline);
                }
                Disposition::Parked(entry, wake_at)
            }
            Step::Done(Ok(output)) => {
                if let Some(deadline) = entry.deadline {
                    if Instant::now() >= deadline {
                        return Disposition::Finished(self.timeout_report(task, &entry));
                    }
                }
                Disposition::Finished(TaskReport::success(
                    task.id(),
                    task.name(),
                    entry.started.elapsed(),
                    output,
                ))
            }
            Step::Done(Err(e)) => Disposition::Finished(TaskReport::failure(
                task.id(),
                task.name(),
                entry.started.elapsed(),
                FailureKind::Execution,
                e.message,
            )),
        }
    }

    fn timeout_report(&self, task: &Task, entry: &Entry) -> TaskReport {
        TaskReport::failure(
            task.id(),
            task.name(),
            entry.started.elapsed(),
            FailureKind::Timeout,
            format!(
                "exceeded declared timeout of {:?}",
                task.timeout().unwrap_or_default()
            ),
        )
    }
}
