use predicates::prelude::*;
use std::fs;

mod common;

#[test]
fn conflicts_reports_overlapping_allocations() {
    let fixture = common::Fixture::new();
    let output = fixture.path("conflicts.yaml");

    fixture
        .command()
        .args(["conflicts", "-s", "S1", "-o", &output])
        .assert()
        .success()
        .stdout(predicate::str::contains("Allocation Conflicts: S1"))
        .stdout(predicate::str::contains("E1 | 2026-03-01 - 2026-03-31 | peak 110%"));

    let yaml = fs::read_to_string(&output).unwrap();
    assert!(yaml.contains("first_allocation_id: A1"));
    assert!(yaml.contains("second_allocation_id: A2"));
}

#[test]
fn scenarios_without_allocations_are_clean() {
    let fixture = common::Fixture::new();
    fixture
        .command()
        .args(["conflicts", "-s", "S2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No allocation conflicts in scenario S2"));
}

#[test]
fn json_output_is_chosen_by_extension() {
    let fixture = common::Fixture::new();
    let output = fixture.path("conflicts.json");

    fixture
        .command()
        .args(["conflicts", "-s", "S1", "-o", &output])
        .assert()
        .success();

    let json = fs::read_to_string(&output).unwrap();
    assert!(json.trim_start().starts_with('{'));
    assert!(json.contains("\"scenario_id\": \"S1\""));
}
