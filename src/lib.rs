pub mod config;
pub mod core;
pub mod counter;
pub mod error;
pub mod harness;
pub mod log;
pub mod registry;
pub mod report;
pub mod suite;

// Execution strategies and the worker-process side
pub mod strategy;
pub mod worker;

pub use crate::core::{Task, TaskId, WorkPlan};
pub use error::{Error, Result};
pub use report::{RunReport, TaskReport};
pub use strategy::StrategyKind;
