//! CLI smoke tests for partplan.
//!
//! These tests drive the binary against a temporary project and check exit
//! codes, printed plans and the state left on disk.

use std::path::Path;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// A library and an application built against it.
const PARTS: &str = r#"
parts:
  liba:
    plugin: make
    source: https://example.com/liba-1.0.tar.gz
  app:
    plugin: nil
    after: [liba]
"#;

/// Create a project directory containing `parts.yaml`.
fn temp_project(content: &str) -> TempDir {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("parts.yaml"), content).unwrap();
  temp
}

/// A command running inside `dir` with `--arch amd64` for stable output.
fn partplan(dir: &Path) -> Command {
  let mut cmd = cargo_bin_cmd!("partplan");
  cmd.current_dir(dunce::canonicalize(dir).unwrap());
  cmd.args(["--arch", "amd64"]);
  cmd
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  cargo_bin_cmd!("partplan")
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  cargo_bin_cmd!("partplan")
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("partplan"));
}

#[test]
fn subcommand_help_works() {
  for cmd in &["plan", "record", "status", "clean", "waves"] {
    cargo_bin_cmd!("partplan")
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

// =============================================================================
// Planning
// =============================================================================

#[test]
fn plan_lists_every_step_on_first_run() {
  let temp = temp_project(PARTS);

  partplan(temp.path())
    .args(["plan", "prime"])
    .assert()
    .success()
    .stdout(predicate::str::contains("liba:pull"))
    .stdout(predicate::str::contains("app:prime"))
    .stdout(predicate::str::contains("never executed"))
    .stdout(predicate::str::contains("10 step(s) to reach 'prime'"));
}

#[test]
fn plan_json_is_machine_readable() {
  let temp = temp_project(PARTS);

  let output = partplan(temp.path())
    .args(["plan", "build", "liba", "--json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let actions: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let steps: Vec<&str> = actions
    .as_array()
    .unwrap()
    .iter()
    .map(|a| a["step"].as_str().unwrap())
    .collect();
  assert_eq!(steps, vec!["pull", "overlay", "build"]);
  assert_eq!(actions[0]["kind"], "run");
  assert_eq!(actions[0]["reason"]["cause"], "never-run");
}

#[test]
fn record_then_plan_is_empty() {
  let temp = temp_project(PARTS);

  partplan(temp.path())
    .args(["record", "prime"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Recorded 10 step(s)"));

  assert!(temp.path().join(".partplan/partplan/state/app/prime.json").exists());

  partplan(temp.path())
    .args(["plan", "prime"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Nothing to do"));

  partplan(temp.path())
    .args(["plan", "prime", "--trace"])
    .assert()
    .success()
    .stdout(predicate::str::contains("up to date"));
}

#[test]
fn changed_source_reruns_dependents() {
  let temp = temp_project(PARTS);
  partplan(temp.path()).args(["record", "prime"]).assert().success();

  std::fs::write(temp.path().join("parts.yaml"), PARTS.replace("1.0", "1.1")).unwrap();

  partplan(temp.path())
    .args(["plan", "prime"])
    .assert()
    .success()
    .stdout(predicate::str::contains("stale: 'source' property changed"))
    .stdout(predicate::str::contains("stale: dependency 'liba' changed"))
    .stdout(predicate::str::contains("app:pull").not());
}

#[test]
fn waves_respect_jobs() {
  let temp = temp_project(PARTS);

  partplan(temp.path())
    .args(["waves", "pull", "--jobs", "1"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Wave 1 (2 step(s))"))
    .stdout(predicate::str::contains("[liba:pull]"))
    .stdout(predicate::str::contains("[app:pull]"));
}

// =============================================================================
// State management
// =============================================================================

#[test]
fn status_and_clean() {
  let temp = temp_project(PARTS);

  partplan(temp.path())
    .arg("status")
    .assert()
    .success()
    .stdout(predicate::str::contains("No step state recorded"));

  partplan(temp.path()).args(["record", "stage", "liba"]).assert().success();

  partplan(temp.path())
    .arg("status")
    .assert()
    .success()
    .stdout(predicate::str::contains("liba"))
    .stdout(predicate::str::contains("stage"));

  partplan(temp.path())
    .args(["clean", "liba"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Cleaned state of 1 part(s): liba"));

  assert!(!temp.path().join(".partplan/partplan/state/liba").exists());
}

#[test]
fn out_of_range_completion_time_does_not_crash() {
  let temp = temp_project(PARTS);
  partplan(temp.path()).args(["record", "pull", "liba"]).assert().success();

  let path = temp.path().join(".partplan/partplan/state/liba/pull.json");
  let mut record: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
  record["completed_at"] = serde_json::json!(300_000_000_000u64);
  std::fs::write(&path, serde_json::to_string(&record).unwrap()).unwrap();

  partplan(temp.path())
    .arg("status")
    .assert()
    .success()
    .stdout(predicate::str::contains("No step state recorded"));

  partplan(temp.path())
    .args(["plan", "pull", "liba"])
    .assert()
    .success()
    .stdout(predicate::str::contains("completion time 300000000000 is out of range"));
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn missing_parts_file_fails() {
  let temp = TempDir::new().unwrap();

  partplan(temp.path())
    .args(["plan", "prime"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to read parts file"));
}

#[test]
fn invalid_step_fails() {
  let temp = temp_project(PARTS);

  partplan(temp.path()).args(["plan", "deploy"]).assert().failure();
}

#[test]
fn unknown_part_fails() {
  let temp = temp_project(PARTS);

  partplan(temp.path())
    .args(["plan", "prime", "nope"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("part 'nope' is not defined"));
}

#[test]
fn cycle_fails() {
  let temp = temp_project(
    r#"
parts:
  a:
    plugin: nil
    after: [b]
  b:
    plugin: nil
    after: [a]
"#,
  );

  partplan(temp.path())
    .args(["plan", "prime"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("dependency cycle detected"));
}
