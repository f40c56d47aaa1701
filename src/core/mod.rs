//! Core domain models for the run harness.
//!
//! This module contains the fundamental data structures used throughout
//! the harness: tasks and the steppable workloads they execute.

pub mod task;
pub mod work;

pub use task::{Task, TaskId};
pub use work::{
    CountWorkload, FnWorkload, PlannedOutcome, SimWorkload, Step, WorkBody, WorkError,
    WorkOutput, WorkPlan, Workload,
};
