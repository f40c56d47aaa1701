//! Integration test suite for the mill harness.
//!
//! These tests exercise the harness end to end: scheduling under each
//! strategy, partial-failure isolation, per-task deadline enforcement,
//! the shared-counter race demonstration, and the worker-process wire
//! protocol through the real binary.
//!
//! # Test Categories
//!
//! - `strategies`: scheduling, ordering and isolation per strategy
//! - `race`: shared-counter outcomes, guarded and unguarded
//! - `timeouts`: per-task deadline enforcement
//! - `cli`: exit codes and worker mode of the compiled binary
//! - `config`: config-file defaults under a scratch home directory
//!
//! # CI Compatibility
//!
//! All work is simulated; no network or repository access is needed.
//! Process tests spawn the compiled mill binary itself.

mod fixtures;

mod cli;
mod config;
mod race;
