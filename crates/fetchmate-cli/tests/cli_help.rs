use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_lists_commands() {
    cargo_bin_cmd!("fetchmate")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("signup"))
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("logout"))
        .stdout(predicate::str::contains("whoami"))
        .stdout(predicate::str::contains("fetch"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_fetch_help_shows_flags() {
    cargo_bin_cmd!("fetchmate")
        .args(["fetch", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--mp3"))
        .stdout(predicate::str::contains("--download"))
        .stdout(predicate::str::contains("--format"))
        .stdout(predicate::str::contains("--output"));
}

#[test]
fn test_fetch_format_requires_download() {
    cargo_bin_cmd!("fetchmate")
        .args(["fetch", "https://example.com", "--format", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--download"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("fetchmate")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fetchmate"));
}
