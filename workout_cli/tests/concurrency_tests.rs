//! Concurrency tests for the workout binary.
//!
//! These tests verify that multiple processes acting for the same user:
//! - Never leave more than one active session behind
//! - Advance a run exactly once per completed exercise
//! - Create plans without losing any of them
//! - Never leave a session behind on a removed plan

use assert_cmd::Command;
use std::fs;
use std::thread;
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

    cli(&temp_dir)
        .args([
            "plan",
            "add",
            "--name",
            "Legs",
            "--exercise",
            "Squat:5x5",
            "--exercise",
            "Lunge:3x12",
            "--exercise",
            "Plank",
        ])
        .assert()
        .success();
    cli(&temp_dir)
        .args(["plan", "add", "--name", "Pull", "--exercise", "Pull-up:4x6"])
        .assert()
        .success();
    temp_dir
}

fn session_lines(dir: &TempDir) -> Vec<serde_json::Value> {
    let contents =
        fs::read_to_string(dir.path().join("sessions/sessions.jsonl")).unwrap_or_default();
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("Corrupt session line"))
        .collect()
}

#[test]
fn test_concurrent_starts_leave_one_active_session() {
    let temp_dir = setup_test_dir();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let mut cmd = cli(&temp_dir);
            let plan = if i % 2 == 0 { "1" } else { "2" };
            thread::spawn(move || {
                cmd.args(["start", "--plan", plan])
                    .output()
                    .expect("Failed to run start")
            })
        })
        .collect();

    for handle in handles {
        let output = handle.join().expect("Thread panicked");
        assert!(
            output.status.success(),
            "start failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let active = session_lines(&temp_dir)
        .into_iter()
        .filter(|record| record["completed"] == false)
        .count();
    assert_eq!(active, 1, "Expected exactly one active session");
}

#[test]
fn test_concurrent_completes_advance_once_each() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["start", "--plan", "1"])
        .assert()
        .success();

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let mut cmd = cli(&temp_dir);
            thread::spawn(move || cmd.arg("complete").output().expect("Failed to run complete"))
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|handle| handle.join().expect("Thread panicked"))
        .filter(|output| output.status.success())
        .count();

    // Three exercises: two advances and one finish; the rest find nothing active
    assert_eq!(successes, 3);

    let history = fs::read_to_string(temp_dir.path().join("runs.csv"))
        .expect("Failed to read history");
    assert_eq!(history.lines().count(), 2, "Expected header plus one run");

    assert!(session_lines(&temp_dir).is_empty());
}

#[test]
fn test_concurrent_status_reads_during_run() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["start", "--plan", "1"])
        .assert()
        .success();

    let readers: Vec<_> = (0..5)
        .map(|_| {
            let mut cmd = cli(&temp_dir);
            thread::spawn(move || cmd.arg("status").output().expect("Failed to run status"))
        })
        .collect();
    let writer = {
        let mut cmd = cli(&temp_dir);
        thread::spawn(move || cmd.arg("complete").output().expect("Failed to run complete"))
    };

    for reader in readers {
        let output = reader.join().expect("Thread panicked");
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(
            stdout.contains("Squat") || stdout.contains("Lunge"),
            "Unexpected status output: {}",
            stdout
        );
    }
    assert!(writer.join().expect("Thread panicked").status.success());
}

#[test]
fn test_concurrent_plan_adds_keep_every_plan() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(temp_dir.path().join("config.toml"), "").expect("Failed to write config");

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let mut cmd = cli(&temp_dir);
            thread::spawn(move || {
                cmd.args(["plan", "add", "--name"])
                    .arg(format!("P{}", i))
                    .args(["--exercise", "Squat"])
                    .output()
                    .expect("Failed to run plan add")
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().expect("Thread panicked").status.success());
    }

    let output = cli(&temp_dir)
        .args(["--json", "plan", "list"])
        .output()
        .expect("Failed to run plan list");
    let plans: Vec<serde_json::Value> =
        serde_json::from_slice(&output.stdout).expect("plan list output is not JSON");

    let mut ids: Vec<u64> = plans
        .iter()
        .map(|plan| plan["id"].as_u64().expect("plan id"))
        .collect();
    ids.sort();
    assert_eq!(ids, (1..=8).collect::<Vec<_>>());
}

#[test]
fn test_remove_racing_starts_leaves_no_session() {
    let temp_dir = setup_test_dir();

    let starts: Vec<_> = (0..6)
        .map(|_| {
            let mut cmd = cli(&temp_dir);
            thread::spawn(move || {
                cmd.args(["start", "--plan", "1"])
                    .output()
                    .expect("Failed to run start")
            })
        })
        .collect();
    let remove = {
        let mut cmd = cli(&temp_dir);
        thread::spawn(move || {
            cmd.args(["plan", "remove", "1"])
                .output()
                .expect("Failed to run plan remove")
        })
    };

    assert!(remove.join().expect("Thread panicked").status.success());
    for start in starts {
        // Starts after the removal fail with NotFound; earlier ones are cleaned up
        start.join().expect("Thread panicked");
    }

    let leftover = session_lines(&temp_dir)
        .into_iter()
        .filter(|record| record["plan_id"] == 1)
        .count();
    assert_eq!(leftover, 0, "Sessions left on the removed plan");
}
