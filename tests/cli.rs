use assert_cmd::prelude::*;
use predicates::prelude::*;

mod common;

#[test]
fn test_cli_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = assert_cmd::cargo_bin_cmd!("scenarios");
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("evaluate"));
    Ok(())
}

#[test]
fn missing_workspace_fails_with_a_message() {
    let mut cmd = assert_cmd::cargo_bin_cmd!("scenarios");
    cmd.args(["-w", "/nonexistent/workspace.yaml", "evaluate", "-s", "S1"]);
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("failed to read workspace"));
}

#[test]
fn unknown_scenarios_are_reported() {
    let fixture = common::Fixture::new();
    fixture
        .command()
        .args(["evaluate", "-s", "NOPE"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("scenario not found: NOPE"));
}

#[test]
fn invalid_config_is_rejected() {
    let fixture = common::Fixture::new();
    let config = fixture.path("bad.yaml");
    std::fs::write(&config, "monte_carlo_iterations: 0\n").unwrap();

    let mut cmd = assert_cmd::cargo_bin_cmd!("scenarios");
    cmd.args(["-w", &fixture.workspace, "--config", &config, "evaluate", "-s", "S1"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("monte_carlo_iterations"));
}
