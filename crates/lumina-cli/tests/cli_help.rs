use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("lumina")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("exec"))
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("models"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_help_shows_global_flags() {
    cargo_bin_cmd!("lumina")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--no-typing"))
        .stdout(predicate::str::contains("--speak"))
        .stdout(predicate::str::contains("--model"));
}

#[test]
fn test_exec_requires_prompt() {
    cargo_bin_cmd!("lumina")
        .arg("exec")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--prompt"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("lumina")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1"));
}
