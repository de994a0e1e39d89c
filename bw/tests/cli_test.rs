//! CLI tests for the model-free commands

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const CONFLICTED: &str = r#"
currentChapter: budget
answers:
  budget:
    totalBudget: 200000
  wishes:
    wishes:
      - title: Heat pump
        priority: must
        estimatedCost: 130000
      - title: New roof
        priority: must
        estimatedCost: 100000
"#;

const BEFORE: &str = r#"
currentChapter: rooms
answers:
  rooms:
    rooms:
      - name: Kitchen
        area: 14
"#;

const AFTER: &str = r#"
currentChapter: rooms
answers:
  rooms:
    rooms:
      - name: Kitchen
        area: 14
      - name: Study
        area: 10
"#;

fn bw(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bw").expect("bw binary");
    cmd.current_dir(dir).env("XDG_DATA_HOME", dir).env("HOME", dir);
    cmd
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).expect("write state file");
}

#[test]
fn test_analyze_reports_blocking_conflict() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write(dir.path(), "state.yml", CONFLICTED);

    bw(dir.path())
        .args(["analyze", "state.yml", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"goal\": \"surface_risks\""))
        .stdout(predicate::str::contains("€30,000"))
        .stdout(predicate::str::contains("\"allowPatches\": false"));
}

#[test]
fn test_analyze_text_output() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write(dir.path(), "state.yml", CONFLICTED);

    bw(dir.path())
        .args(["analyze", "state.yml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("budget_risk"))
        .stdout(predicate::str::contains("suppressed"));
}

#[test]
fn test_diff_user_edit_raises_room_added() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write(dir.path(), "before.yml", BEFORE);
    write(dir.path(), "after.yml", AFTER);

    bw(dir.path())
        .args(["diff", "before.yml", "after.yml", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rooms.rooms"))
        .stdout(predicate::str::contains("room_added"));
}

#[test]
fn test_diff_assistant_edit_is_ignored() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write(dir.path(), "before.yml", BEFORE);
    write(dir.path(), "after.yml", AFTER);

    bw(dir.path())
        .args(["diff", "before.yml", "after.yml", "--origin", "assistant"])
        .assert()
        .success()
        .stdout(predicate::str::contains("room_added").not())
        .stdout(predicate::str::contains("none"));
}

#[test]
fn test_context_stays_under_ceiling() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write(dir.path(), "state.yml", CONFLICTED);

    bw(dir.path())
        .args(["context", "state.yml", "--message", "Is this affordable?", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"focusedChapter\": \"budget\""))
        .stdout(predicate::str::contains("tokenEstimate"));
}

#[test]
fn test_missing_state_file_fails() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    bw(dir.path())
        .args(["analyze", "missing.yml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read state file"));
}
