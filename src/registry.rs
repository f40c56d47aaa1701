//! Task registry: the ordered set of work a run executes.
//!
//! Registration order is preserved and meaningful. `all_tasks()` walks the
//! set lazily in that order, and each call restarts from the first task,
//! which keeps repeated runs over the same registry deterministic.

use std::collections::HashMap;

use crate::core::Task;
use crate::{mlog_debug, Error, Result};

/// Ordered collection of registered tasks, keyed by name.
///
/// The registry is the single owner of all tasks; strategies borrow a
/// slice of it for the duration of one run.
#[derive(Debug, Default)]
pub struct Registry {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateTask` if a task with the same name is
    /// already registered. The registry is unchanged on error.
    pub fn register(&mut self, task: Task) -> Result<()> {
        if self.index.contains_key(task.name()) {
            return Err(Error::DuplicateTask {
                name: task.name().to_string(),
            });
        }
        mlog_debug!(
            "Registry::register name={} id={}",
            task.name(),
            task.id().short()
        );
        self.index.insert(task.name().to_string(), self.tasks.len());
        self.tasks.push(task);
        Ok(())
    }

    /// Iterate all tasks in registration order.
    ///
    /// Lazy and restartable: every call starts over from the first
    /// registered task.
    pub fn all_tasks(&self) -> impl Iterator<Item = &Task> + '_ {
        self.tasks.iter()
    }

    /// Borrow the registered tasks as a slice, in registration order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Look up a task by name.
    pub fn get(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|&i| &self.tasks[i])
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
