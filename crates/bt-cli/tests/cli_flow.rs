//! End-to-end tests driving the compiled `bt` binary.
//!
//! Each test gets its own temp home and database; configuration is supplied
//! through `BT_*` environment variables.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn bt_binary() -> String {
    env!("CARGO_BIN_EXE_bt").to_string()
}

fn run_bt(home: &Path, args: &[&str]) -> Output {
    Command::new(bt_binary())
        .env("HOME", home)
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("XDG_DATA_HOME")
        .env("BT_DATABASE_PATH", home.join("bt.db"))
        .args(args)
        .output()
        .expect("failed to run bt")
}

fn run_ok(home: &Path, args: &[&str]) -> String {
    let output = run_bt(home, args);
    assert!(
        output.status.success(),
        "bt {args:?} should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("utf-8 stdout")
}

fn register_baby(home: &Path) {
    let stdout = run_ok(
        home,
        &["baby", "add", "--name", "Robin", "--birth-date", "2025-03-01"],
    );
    assert!(stdout.contains("Registered Robin"));
}

#[test]
fn full_caregiving_flow() {
    let temp = TempDir::new().unwrap();
    register_baby(temp.path());

    // Sleep session
    let stdout = run_ok(temp.path(), &["sleep", "start"]);
    assert!(stdout.contains("Sleep started"));
    let stdout = run_ok(temp.path(), &["sleep", "end"]);
    assert!(stdout.contains("Sleep ended"));

    // Bottle lifecycle
    let stdout = run_ok(temp.path(), &["bottle", "prepare", "--amount", "4.0"]);
    assert!(stdout.contains("Prepared 4.0 oz bottle"));
    assert!(stdout.contains("Expires at"));
    let stdout = run_ok(temp.path(), &["bottle", "feed"]);
    assert!(stdout.contains("Feeding started"));
    let stdout = run_ok(temp.path(), &["bottle", "finish", "1.0"]);
    assert!(stdout.contains("3.0 oz consumed"));

    // Diaper
    let stdout = run_ok(temp.path(), &["diaper", "wet"]);
    assert!(stdout.contains("Diaper change (wet)"));

    // Status sees everything
    let stdout = run_ok(temp.path(), &["status"]);
    assert!(stdout.contains("Robin"));
    assert!(stdout.contains("Awake"));
    assert!(stdout.contains("Last diaper: wet"));

    // One JSONL line per event: sleep, feed, diaper
    let stdout = run_ok(temp.path(), &["events"]);
    assert_eq!(stdout.lines().count(), 3);
    for line in stdout.lines() {
        let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(parsed["payload"]["type"].is_string());
    }
}

#[test]
fn second_sleep_start_is_rejected_with_hint() {
    let temp = TempDir::new().unwrap();
    register_baby(temp.path());

    run_ok(temp.path(), &["sleep", "start"]);
    let output = run_bt(temp.path(), &["sleep", "start"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("bt sleep end"),
        "conflict should carry a hint: {stderr}"
    );
}

#[test]
fn toggle_starts_then_ends() {
    let temp = TempDir::new().unwrap();
    register_baby(temp.path());

    let stdout = run_ok(temp.path(), &["sleep", "toggle"]);
    assert!(stdout.contains("Sleep started"));
    let stdout = run_ok(temp.path(), &["sleep", "toggle"]);
    assert!(stdout.contains("Sleep ended"));
}

#[test]
fn commands_without_a_baby_point_at_registration() {
    let temp = TempDir::new().unwrap();
    let output = run_bt(temp.path(), &["sleep", "start"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("bt baby add"));
}

#[test]
fn discarded_bottles_stay_out_of_the_flow_but_in_the_audit_trail() {
    let temp = TempDir::new().unwrap();
    register_baby(temp.path());

    run_ok(temp.path(), &["bottle", "prepare", "--amount", "3.0"]);
    let stdout = run_ok(temp.path(), &["bottle", "discard"]);
    assert!(stdout.contains("Discarded bottle"));

    let stdout = run_ok(temp.path(), &["bottle", "list"]);
    assert!(stdout.contains("No bottles in play."));

    assert_eq!(run_ok(temp.path(), &["events"]).lines().count(), 0);
    assert_eq!(
        run_ok(temp.path(), &["events", "--include-deleted"])
            .lines()
            .count(),
        1
    );
}

#[test]
fn predict_reports_a_window_for_a_new_baby() {
    let temp = TempDir::new().unwrap();
    register_baby(temp.path());

    let stdout = run_ok(temp.path(), &["predict"]);
    assert!(stdout.contains("Next nap window:"));
    assert!(stdout.contains("learning confidence"));
}
