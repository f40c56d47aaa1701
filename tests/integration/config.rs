//! Config-file tests against the compiled binary.
//!
//! Each test gets its own scratch home directory, so the real user's
//! ~/.mill is never read or written.

use std::fs;
use std::process::Command;

use tempfile::TempDir;

use crate::fixtures::mill_binary;

fn run_mill_with_home(home: &TempDir, args: &[&str]) -> std::process::Output {
    Command::new(mill_binary())
        .args(args)
        .env("HOME", home.path())
        .output()
        .expect("failed to spawn mill")
}

/// Test: Config file supplies the default strategy
/// Given ~/.mill/mill.toml selecting the cooperative strategy
/// When mill run executes without a --strategy flag
/// Then the report header shows the configured strategy
#[test]
fn test_config_default_strategy_applies() {
    let home = TempDir::new().expect("failed to create scratch home");
    let mill_dir = home.path().join(".mill");
    fs::create_dir_all(&mill_dir).unwrap();
    fs::write(
        mill_dir.join("mill.toml"),
        "default_strategy = \"cooperative\"\n",
    )
    .unwrap();

    let output = run_mill_with_home(&home, &["run", "-n", "2"]);
    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Strategy:  cooperative"));
}

/// Test: A flag beats the config file
/// Given a config file selecting cooperative
/// When mill run passes --strategy threads
/// Then the report header shows threads
#[test]
fn test_flag_overrides_config_strategy() {
    let home = TempDir::new().expect("failed to create scratch home");
    let mill_dir = home.path().join(".mill");
    fs::create_dir_all(&mill_dir).unwrap();
    fs::write(
        mill_dir.join("mill.toml"),
        "default_strategy = \"cooperative\"\n",
    )
    .unwrap();

    let output = run_mill_with_home(&home, &["run", "-s", "threads", "-n", "2"]);
    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Strategy:  threads"));
}

/// Test: A missing config file falls back to built-in defaults
/// Given a scratch home with no ~/.mill directory
/// When mill run executes
/// Then the run still succeeds on the built-in threads default
#[test]
fn test_missing_config_uses_builtin_defaults() {
    let home = TempDir::new().expect("failed to create scratch home");

    let output = run_mill_with_home(&home, &["run", "-n", "2"]);
    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Strategy:  threads"));
}

/// Test: A malformed config file is a setup error
/// Given a mill.toml that does not parse
/// When mill run starts
/// Then it exits 2 with an error on stderr
#[test]
fn test_malformed_config_exits_two() {
    let home = TempDir::new().expect("failed to create scratch home");
    let mill_dir = home.path().join(".mill");
    fs::create_dir_all(&mill_dir).unwrap();
    fs::write(mill_dir.join("mill.toml"), "default_strategy = [not toml").unwrap();

    let output = run_mill_with_home(&home, &["run", "-n", "2"]);
    assert_eq!(output.status.code(), Some(2));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error"));
}
