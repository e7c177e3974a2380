use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("docdesk")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("logout"))
        .stdout(predicate::str::contains("whoami"))
        .stdout(predicate::str::contains("request"))
        .stdout(predicate::str::contains("guard"));
}

#[test]
fn test_config_help_shows_subcommands() {
    cargo_bin_cmd!("docdesk")
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("path"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("set-url"));
}

#[test]
fn test_login_requires_email() {
    cargo_bin_cmd!("docdesk")
        .arg("login")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--email"));
}
