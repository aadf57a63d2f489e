use assert_fs::prelude::*;
use predicates::prelude::*;
use std::fs;

#[test]
fn forecast_projects_an_increasing_series() {
    let series: String = (0..30)
        .map(|day| format!("- date: 2026-01-{:02}\n  value: {}\n", day + 1, 100 + 2 * day))
        .collect();
    let input = assert_fs::NamedTempFile::new("series.yaml").unwrap();
    input.write_str(&series).unwrap();
    let output = assert_fs::NamedTempFile::new("forecast.yaml").unwrap();

    let mut cmd = assert_cmd::cargo_bin_cmd!("scenarios");
    cmd.args([
        "forecast",
        "-i",
        input.path().to_str().unwrap(),
        "--horizon",
        "7",
        "-o",
        output.path().to_str().unwrap(),
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Trend: increasing"))
        .stdout(predicate::str::contains("2026-01-31 |"))
        .stdout(predicate::str::contains("2026-02-06 |"));

    let yaml = fs::read_to_string(output.path()).unwrap();
    assert!(yaml.contains("points:"));
    assert!(yaml.contains("trend: increasing"));
}

#[test]
fn short_series_are_insufficient() {
    let input = assert_fs::NamedTempFile::new("short.yaml").unwrap();
    input
        .write_str("- date: 2026-01-01\n  value: 1\n- date: 2026-01-02\n  value: 2\n")
        .unwrap();

    let mut cmd = assert_cmd::cargo_bin_cmd!("scenarios");
    cmd.args(["forecast", "-i", input.path().to_str().unwrap()]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("insufficient data"));
}
