//! CLI argument parsing tests

use assert_cmd::Command;
use predicates::prelude::*;

fn peanut() -> Command {
    Command::new(env!("CARGO_BIN_EXE_peanut"))
}

#[test]
fn test_help_flag() {
    let mut cmd = peanut();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("autonomous task agent"))
        .stdout(predicate::str::contains("--help"))
        .stdout(predicate::str::contains("--version"));
}

#[test]
fn test_version_flag() {
    let mut cmd = peanut();
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_no_args_shows_help() {
    let mut cmd = peanut();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_init_command_help() {
    let mut cmd = peanut();
    cmd.args(["init", "--help"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Initialize"));
}

#[test]
fn test_run_command_help() {
    let mut cmd = peanut();
    cmd.args(["run", "--help"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Run a task"))
        .stdout(predicate::str::contains("<TASK>"));
}

#[test]
fn test_run_requires_a_task() {
    let mut cmd = peanut();
    cmd.arg("run");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_status_command_help() {
    let mut cmd = peanut();
    cmd.args(["status", "--help"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_jobs_subcommands_parse() {
    let mut cmd = peanut();
    cmd.args(["jobs", "--help"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("List scheduled jobs"))
        .stdout(predicate::str::contains("Add a scheduled job"));

    let mut cmd = peanut();
    cmd.args(["jobs", "add", "--help"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--task"))
        .stdout(predicate::str::contains("--every"))
        .stdout(predicate::str::contains("--cron"));
}

#[test]
fn test_jobs_add_requires_task() {
    let mut cmd = peanut();
    cmd.args(["jobs", "add", "--every", "60"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--task"));
}

#[test]
fn test_unknown_command_fails() {
    let mut cmd = peanut();
    cmd.arg("frobnicate");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized"));
}
