//! Corruption and recovery tests for the workout binary.
//!
//! These tests verify that the CLI behaves sensibly when:
//! - The session file has damaged lines
//! - The plan file is unreadable
//! - The history file has damaged rows
//! - The history file cannot be written
//! - Data files are missing entirely

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::{self, OpenOptions};
use std::io::Write;
use tempfile::TempDir;

fn cli(dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("workout"));
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("--config")
        .arg(dir.path().join("config.toml"))
        .arg("--user")
        .arg("alice");
    cmd
}

fn setup_test_dir() -> TempDir {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(temp_dir.path().join("config.toml"), "").expect("Failed to write config");
    temp_dir
}

fn add_plan(dir: &TempDir) {
    cli(dir)
        .args([
            "plan",
            "add",
            "--name",
            "Full Body",
            "--exercise",
            "Deadlift:3x5",
            "--exercise",
            "Burpee:3x10",
        ])
        .assert()
        .success();
}

#[test]
fn test_damaged_session_line_is_skipped() {
    let temp_dir = setup_test_dir();
    add_plan(&temp_dir);

    cli(&temp_dir)
        .args(["start", "--plan", "1"])
        .assert()
        .success();

    // Simulate a torn write at the end of the file
    let sessions_path = temp_dir.path().join("sessions/sessions.jsonl");
    let mut file = OpenOptions::new()
        .append(true)
        .open(&sessions_path)
        .expect("Failed to open sessions");
    writeln!(file, "{{\"id\": \"broken").expect("Failed to write");
    drop(file);

    cli(&temp_dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Deadlift"));

    cli(&temp_dir)
        .arg("complete")
        .assert()
        .success()
        .stdout(predicate::str::contains("Burpee"));

    // The rewrite after the transaction drops the damaged line
    let contents = fs::read_to_string(&sessions_path).expect("Failed to read sessions");
    assert!(!contents.contains("broken"));
}

#[test]
fn test_corrupt_plan_file_is_an_error() {
    let temp_dir = setup_test_dir();
    fs::write(temp_dir.path().join("plans.json"), "{ not json").expect("Failed to write");

    cli(&temp_dir)
        .args(["plan", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Json"));

    cli(&temp_dir)
        .args(["start", "--plan", "1"])
        .assert()
        .failure();

    // Plan file is left for the user to repair
    let contents = fs::read_to_string(temp_dir.path().join("plans.json")).unwrap();
    assert_eq!(contents, "{ not json");
}

#[test]
fn test_damaged_history_rows_are_skipped() {
    let temp_dir = setup_test_dir();
    add_plan(&temp_dir);

    cli(&temp_dir)
        .args(["start", "--plan", "1", "--rest", "75"])
        .assert()
        .success();
    cli(&temp_dir).arg("complete").assert().success();
    cli(&temp_dir).arg("complete").assert().success();

    let history_path = temp_dir.path().join("runs.csv");
    let mut file = OpenOptions::new()
        .append(true)
        .open(&history_path)
        .expect("Failed to open history");
    writeln!(file, "alice,1,2,60,last tuesday,").expect("Failed to write");
    drop(file);

    cli(&temp_dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("75s rest"))
        .stdout(predicate::str::contains("60s rest").not());
}

#[test]
fn test_unwritable_history_still_finishes_run() {
    let temp_dir = setup_test_dir();
    add_plan(&temp_dir);

    // A directory where the history file should be makes every append fail
    fs::create_dir_all(temp_dir.path().join("runs.csv")).expect("Failed to create dir");

    cli(&temp_dir)
        .args(["start", "--plan", "1"])
        .assert()
        .success();
    cli(&temp_dir).arg("complete").assert().success();

    cli(&temp_dir)
        .arg("complete")
        .assert()
        .success()
        .stdout(predicate::str::contains("Workout finished"))
        .stderr(predicate::str::contains("Could not save workout history"));

    cli(&temp_dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No active workout session."));
}

#[test]
fn test_fresh_data_dir() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No active workout session."));

    cli(&temp_dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("No finished workouts yet."));

    cli(&temp_dir)
        .args(["plan", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No workout plans yet"));
}

#[test]
fn test_unreadable_config_is_an_error() {
    let temp_dir = setup_test_dir();
    fs::write(temp_dir.path().join("config.toml"), "[workout\n").expect("Failed to write");

    cli(&temp_dir)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Toml"));
}
