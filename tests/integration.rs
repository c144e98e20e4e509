//! Integration tests for the userdeck list and show commands

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command as AssertCommand;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

/// Isolated environment: an empty config file and a saved API response
struct TestEnv {
    temp_dir: TempDir,
    config_path: PathBuf,
}

impl TestEnv {
    fn new() -> Self {
        Self::with_config("")
    }

    fn with_config(contents: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, contents).unwrap();
        Self {
            temp_dir,
            config_path,
        }
    }

    /// Command reading the fixture response
    fn cmd(&self) -> AssertCommand {
        self.cmd_for(&fixture_path())
    }

    fn cmd_for(&self, source: &Path) -> AssertCommand {
        let mut cmd = userdeck_cmd();
        cmd.env("XDG_CACHE_HOME", self.temp_dir.path().join("cache"))
            .env_remove("USERDECK_LOG")
            .arg("--config")
            .arg(&self.config_path)
            .arg("--source")
            .arg(source);
        cmd
    }

    fn write_source(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }
}

fn userdeck_cmd() -> AssertCommand {
    AssertCommand::cargo_bin("userdeck").unwrap()
}

fn fixture_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("users.json")
}

// =============================================================================
// list
// =============================================================================

#[test]
fn list_prints_every_card_in_order() {
    let env = TestEnv::new();
    env.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(
            "0\tAnn Lee\tann.lee@example.com\tReno, Nevada\n\
             1\tBob Lee\tbob.lee@example.com\tTulsa, Oklahoma\n\
             2\tCid Fox\tcid.fox@example.com\tSalem, Oregon\n",
        );
}

#[test]
fn list_query_filters_by_name_ignoring_case() {
    let env = TestEnv::new();
    env.cmd()
        .args(["list", "--query", "LEE"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ann Lee"))
        .stdout(predicate::str::contains("Bob Lee"))
        .stdout(predicate::str::contains("Cid Fox").not());
}

#[test]
fn list_query_without_matches_prints_nothing() {
    let env = TestEnv::new();
    env.cmd()
        .args(["list", "-q", "zzz"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn list_of_empty_response_prints_nothing() {
    let env = TestEnv::new();
    let source = env.write_source("empty.json", r#"{"results": []}"#);
    env.cmd_for(&source)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

// =============================================================================
// show
// =============================================================================

#[test]
fn show_prints_the_detail_block() {
    let env = TestEnv::new();
    env.cmd()
        .args(["show", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ms. Ann Lee  (1 of 3)"))
        .stdout(predicate::str::contains("(775) 555-0199"))
        .stdout(predicate::str::contains(
            "4021 Hickory Creek Dr, Reno, Nevada, 89501",
        ))
        .stdout(predicate::str::contains("1984-03-17"))
        .stdout(predicate::str::contains("T08:12").not());
}

#[test]
fn show_falls_back_to_landline_when_cell_is_empty() {
    let env = TestEnv::new();
    env.cmd()
        .args(["show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(918) 555-0144"))
        .stdout(predicate::str::contains("Lakeview St, Tulsa, Oklahoma, 74103"));
}

#[test]
fn show_wraps_negative_and_past_the_end_indices() {
    let env = TestEnv::new();
    env.cmd()
        .args(["show", "-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Mr. Cid Fox  (3 of 3)"));

    env.cmd()
        .args(["show", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ms. Ann Lee  (1 of 3)"));
}

#[test]
fn show_with_no_users_fails_cleanly() {
    let env = TestEnv::new();
    let source = env.write_source("empty.json", r#"{"results": []}"#);
    env.cmd_for(&source)
        .args(["show", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no user to show"));
}

// =============================================================================
// errors
// =============================================================================

#[test]
fn missing_source_file_is_reported() {
    let env = TestEnv::new();
    let missing = env.temp_dir.path().join("nope.json");
    env.cmd_for(&missing)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load users"));
}

#[test]
fn malformed_source_is_reported() {
    let env = TestEnv::new();
    let source = env.write_source("broken.json", "{\"results\": [");
    env.cmd_for(&source)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load users"));
}

#[test]
fn missing_explicit_config_is_an_error() {
    let env = TestEnv::new();
    userdeck_cmd()
        .arg("--config")
        .arg(env.temp_dir.path().join("absent.toml"))
        .arg("--source")
        .arg(fixture_path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn colliding_key_bindings_are_rejected() {
    let env = TestEnv::with_config(
        r#"
[keys.gallery]
open = ["q"]
"#,
    );
    env.cmd()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}

#[test]
fn zero_results_is_rejected() {
    let env = TestEnv::new();
    env.cmd()
        .args(["--results", "0", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--results"));
}

#[test]
fn help_lists_subcommands() {
    userdeck_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("--source"));
}
