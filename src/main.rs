use std::time::Duration;

use clap::{Parser, Subcommand};

use mill::config::Config;
use mill::counter::{self, RaceOutcome};
use mill::harness::Harness;
use mill::report::{RunReport, TaskOutcome};
use mill::strategy::StrategyKind;
use mill::{mlog, suite, worker, Result};

/// Mill - task runner harness with swappable execution strategies
#[derive(Parser, Debug)]
#[command(name = "mill")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    MILL_DEBUG=1    Enable debug logging (alternative to --debug)")]
pub struct Cli {
    /// Enable debug logging (writes to ~/.mill/mill.log)
    #[arg(short = 'd', long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Harness commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the built-in task suite under a strategy
    Run {
        /// Execution strategy: cooperative, threads, or processes
        #[arg(long, short = 's')]
        strategy: Option<String>,

        /// Number of pool workers
        #[arg(long, short = 'w')]
        workers: Option<usize>,

        /// Number of tasks to run
        #[arg(long, short = 'n')]
        tasks: Option<usize>,

        /// Emit the full run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Race tasks against one shared counter
    Race {
        /// Execution strategy: cooperative, threads, or processes
        #[arg(long, short = 's')]
        strategy: Option<String>,

        /// Number of pool workers
        #[arg(long, short = 'w')]
        workers: Option<usize>,

        /// Number of incrementing tasks
        #[arg(long, short = 'n', default_value_t = 8)]
        tasks: usize,

        /// Increments each task applies
        #[arg(long, short = 'i')]
        increments: Option<u64>,

        /// Drop the mutex guard and let increments race
        #[arg(long)]
        no_guard: bool,

        /// Emit the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Execute one serialized work order and print its report line
    #[command(hide = true)]
    Worker {
        /// JSON work order from the process pool
        #[arg(long)]
        plan: String,
    },
}

fn main() {
    let cli = Cli::parse();

    // Worker mode runs before the normal logger init: the child appends to
    // the shared log instead of truncating it, and its stdout belongs to
    // the wire protocol
    if let Some(Command::Worker { plan }) = &cli.command {
        std::process::exit(worker::run_worker(plan));
    }

    mill::log::init_with_debug(cli.debug);
    if cli.debug {
        mlog!("Mill starting (debug mode enabled)");
    } else {
        mlog!("Mill starting");
    }

    let code = match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            2
        }
    };
    std::process::exit(code);
}

fn dispatch(cli: Cli) -> Result<i32> {
    let config = Config::load()?;

    match cli.command {
        Some(Command::Worker { .. }) => Ok(0), // handled in main
        Some(Command::Run {
            strategy,
            workers,
            tasks,
            json,
        }) => run_suite(strategy, workers, tasks, json, &config),
        Some(Command::Race {
            strategy,
            workers,
            tasks,
            increments,
            no_guard,
            json,
        }) => run_race(strategy, workers, tasks, increments, no_guard, json, &config),
        // Bare `mill` runs the suite with configured defaults
        None => run_suite(None, None, None, false, &config),
    }
}

/// Resolve the strategy kind: flag beats config file beats built-in.
fn resolve_strategy(flag: Option<String>, config: &Config) -> Result<StrategyKind> {
    match flag {
        Some(name) => name.parse(),
        None => config.effective_strategy().parse(),
    }
}

/// Run the built-in suite and report per task.
///
/// Exit code 0 when every task succeeded, 1 otherwise. Failures inside
/// tasks never abort the run; they show up in the report.
fn run_suite(
    strategy: Option<String>,
    workers: Option<usize>,
    tasks: Option<usize>,
    json: bool,
    config: &Config,
) -> Result<i32> {
    let kind = resolve_strategy(strategy, config)?;
    let workers = workers.unwrap_or_else(|| config.effective_workers());
    let count = tasks.unwrap_or(suite::SUITE_SIZE);
    mlog!(
        "Run command: strategy={}, workers={}, tasks={}",
        kind,
        workers,
        count
    );

    let mut harness = Harness::new();
    harness.register_all(suite::download_tasks(count))?;
    if count > suite::SUITE_SIZE {
        harness.register_all(suite::mixed_tasks(count - suite::SUITE_SIZE, 0))?;
    }

    let report = harness.run(kind, workers)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_run_report(&report, workers);
    }

    Ok(if report.all_succeeded() { 0 } else { 1 })
}

/// Race `tasks` tasks against one shared counter and compare the final
/// value with serial arithmetic.
///
/// Exit code 0 when the observed count matches expected, 1 when updates
/// were lost.
#[allow(clippy::too_many_arguments)]
fn run_race(
    strategy: Option<String>,
    workers: Option<usize>,
    tasks: usize,
    increments: Option<u64>,
    no_guard: bool,
    json: bool,
    config: &Config,
) -> Result<i32> {
    let kind = resolve_strategy(strategy, config)?;
    let workers = workers.unwrap_or_else(|| config.effective_workers());
    let increments = increments.unwrap_or_else(|| config.effective_increments());
    mlog!(
        "Race command: strategy={}, workers={}, tasks={}, increments={}, guard={}",
        kind,
        workers,
        tasks,
        increments,
        !no_guard
    );

    let outcome = counter::increment_n_times(kind, tasks, increments, !no_guard, workers)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_race_outcome(kind, workers, tasks, increments, !no_guard, &outcome);
    }

    Ok(if outcome.lossy() { 1 } else { 0 })
}

fn print_run_report(report: &RunReport, workers: usize) {
    println!();
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║                        Run Complete                        ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();
    println!("  Run ID:    {}", report.run_id.short());
    println!("  Strategy:  {}", format_strategy(report.strategy, workers));
    println!();

    for task in &report.reports {
        println!(
            "  {} {:<24} {:>7}  {}",
            format_mark(task.is_success()),
            truncate_string(&task.name, 24),
            format_elapsed(task.elapsed),
            format_outcome(&task.outcome)
        );
    }

    println!();
    println!("─────────────────────────────────────────────────────────────");
    println!(
        "  Total succeeded:  {} of {}",
        report.summary.succeeded,
        report.summary.total()
    );
    println!(
        "  Total time taken: {:.2} seconds",
        report.summary.total_elapsed.as_secs_f64()
    );
}

fn print_race_outcome(
    kind: StrategyKind,
    workers: usize,
    tasks: usize,
    increments: u64,
    guarded: bool,
    outcome: &RaceOutcome,
) {
    println!();
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║                       Race Complete                        ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();
    println!("  Strategy:      {}", format_strategy(kind, workers));
    println!("  Tasks:         {} x {} increments", tasks, increments);
    println!("  Guard:         {}", if guarded { "on" } else { "off" });
    println!();
    println!("  Expected:      {}", outcome.expected);
    if outcome.lossy() {
        println!("  Observed:      \x1b[31m{}\x1b[0m", outcome.observed);
        println!("  Updates lost:  \x1b[31m{}\x1b[0m", outcome.lost());
    } else {
        println!("  Observed:      \x1b[32m{}\x1b[0m", outcome.observed);
        println!("  Updates lost:  0");
    }
}

/// Strategy line for the report header. The cooperative scheduler has no
/// pool, so no worker count is shown for it.
fn format_strategy(kind: StrategyKind, workers: usize) -> String {
    match kind {
        StrategyKind::Cooperative => format!("{}", kind),
        _ => format!("{} ({} workers)", kind, workers),
    }
}

/// Green check or red cross for a task row.
fn format_mark(success: bool) -> String {
    if success {
        "\x1b[32m✓\x1b[0m".to_string()
    } else {
        "\x1b[31m✗\x1b[0m".to_string()
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    format!("{}ms", elapsed.as_millis())
}

/// Result column for a task row. Failures are red.
fn format_outcome(outcome: &TaskOutcome) -> String {
    match outcome {
        TaskOutcome::Success { detail: None } => "ok".to_string(),
        TaskOutcome::Success {
            detail: Some(detail),
        } => detail.clone(),
        TaskOutcome::Failed { kind, message } => {
            format!("\x1b[31m{}: {}\x1b[0m", kind, message)
        }
    }
}

/// Truncate a string to a maximum number of characters, adding "..." if
/// truncated. Cuts on char boundaries so multibyte names cannot panic.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
