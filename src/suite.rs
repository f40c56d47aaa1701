//! Built-in task suite.
//!
//! Ships a batch of simulated downloads so the harness has something real
//! to chew on out of the box. Durations and byte counts are derived from a
//! hash of the site name, so the suite is fully deterministic run to run;
//! one site always fails, which keeps partial-failure handling visible in
//! the default run.

use std::time::Duration;

use crate::core::{Task, WorkPlan};

/// Simulated download sources. The flaky one stays last so small suites
/// are all-success.
const SITES: [&str; 10] = [
    "cdn.example.com",
    "mirror.example.org",
    "assets.example.net",
    "static.example.io",
    "files.example.dev",
    "media.example.co",
    "archive.example.org",
    "packages.example.com",
    "images.example.net",
    "flaky.example.net",
];

/// Site that fails on every attempt.
pub const FLAKY_SITE: &str = "flaky.example.net";

/// Number of tasks in the full download suite.
pub const SUITE_SIZE: usize = SITES.len();

/// FNV-1a over the task name. Cheap, stable across runs and platforms.
fn seed(name: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in name.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

/// Build up to [`SUITE_SIZE`] simulated download tasks, one per site, in
/// suite order.
pub fn download_tasks(count: usize) -> Vec<Task> {
    SITES
        .iter()
        .take(count)
        .map(|site| download_task(site))
        .collect()
}

fn download_task(site: &str) -> Task {
    let s = seed(site);
    let duration = Duration::from_millis(40 + s % 80);
    let plan = if site == FLAKY_SITE {
        WorkPlan::sim(duration)
            .with_slices(2)
            .fail_with("connection reset by peer")
    } else {
        let bytes = 1024 + s % (63 * 1024);
        WorkPlan::sim(duration)
            .with_slices(2)
            .succeed_with_units(bytes)
            .with_success_detail(format!("{} bytes", bytes))
    };
    Task::from_plan(site, plan)
}

/// Build `count` generic jobs, every `fail_every`-th one failing.
///
/// Used to pad a run past the download suite and in demos that want a
/// controlled failure mix. `fail_every == 0` disables failures.
pub fn mixed_tasks(count: usize, fail_every: usize) -> Vec<Task> {
    (0..count)
        .map(|i| {
            let name = format!("job-{:02}", i + 1);
            let s = seed(&name);
            let duration = Duration::from_millis(20 + s % 60);
            let plan = if fail_every > 0 && (i + 1) % fail_every == 0 {
                WorkPlan::sim(duration)
                    .with_slices(2)
                    .fail_with("simulated job failure")
            } else {
                WorkPlan::sim(duration)
                    .with_slices(2)
                    .succeed_with_units(s % 4096)
            };
            Task::from_plan(&name, plan)
        })
        .collect()
}
