//! Task data model for the run harness.
//!
//! Tasks are the named, registered units of work a strategy executes. A
//! task does not hold workload state itself; it holds a factory that
//! builds a fresh workload per execution attempt, which is what makes a
//! registered task set re-runnable.

use crate::core::work::{FnWorkload, WorkError, WorkOutput, WorkPlan, Workload};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier for a task within a run.
///
/// Uses UUID v4 for generation and provides a short form display
/// for human-readable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Create a new unique task identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return first 8 characters of the UUID for display.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

type WorkFactory = Arc<dyn Fn() -> Box<dyn Workload> + Send + Sync>;

/// A named unit of work with a declared simulated duration.
///
/// Immutable once registered. Plan-backed tasks carry a serializable
/// [`WorkPlan`] and can run under any strategy; closure-backed tasks run
/// in-process only, since a closure cannot cross a process boundary.
#[derive(Clone)]
pub struct Task {
    id: TaskId,
    name: String,
    factory: WorkFactory,
    plan: Option<WorkPlan>,
    timeout: Option<Duration>,
}

impl Task {
    /// Create a task from a serializable work plan.
    ///
    /// The task's declared timeout is seeded from the plan's.
    pub fn from_plan(name: &str, plan: WorkPlan) -> Self {
        let timeout = plan.timeout();
        let factory_plan = plan.clone();
        Self {
            id: TaskId::new(),
            name: name.to_string(),
            factory: Arc::new(move || factory_plan.build()),
            plan: Some(plan),
            timeout,
        }
    }

    /// Create a task from a closure.
    ///
    /// The closure is shared across execution attempts; each attempt wraps
    /// it in a fresh one-shot workload.
    pub fn from_fn<F>(name: &str, f: F) -> Self
    where
        F: Fn() -> std::result::Result<WorkOutput, WorkError> + Send + Sync + 'static,
    {
        let shared = Arc::new(f);
        Self {
            id: TaskId::new(),
            name: name.to_string(),
            factory: Arc::new(move || {
                let call = Arc::clone(&shared);
                Box::new(FnWorkload::new(move || (call)()))
            }),
            plan: None,
            timeout: None,
        }
    }

    /// Declare a per-task deadline.
    ///
    /// Overrides any timeout the plan carried, and keeps the plan's copy
    /// in sync so a transported plan enforces the same deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        if let Some(plan) = &mut self.plan {
            *plan = plan.clone().with_timeout(timeout);
        }
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The serializable plan, if this task is plan-backed.
    pub fn plan(&self) -> Option<&WorkPlan> {
        self.plan.as_ref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Build a fresh workload for one execution attempt.
    pub fn fresh_workload(&self) -> Box<dyn Workload> {
        (self.factory)()
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("plan", &self.plan)
            .field("timeout", &self.timeout)
            .finish()
    }
}
