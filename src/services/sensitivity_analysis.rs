use clap::ValueEnum;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::domain::scenario::Scenario;
use crate::services::engine_config_yaml::EngineConfig;
use crate::services::evaluation_types::ScenarioResult;
use crate::services::scenario_evaluator::{
    EvaluationError, EvaluationInput, evaluate_scenario_seeded,
};
use crate::services::statistics::mean;

pub const DEFAULT_VARIATIONS: [f64; 4] = [-0.2, -0.1, 0.1, 0.2];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensitivityError {
    #[error("parameter not found: {0}")]
    UnknownParameter(String),
    #[error("parameter {0} is not numeric")]
    NotNumeric(String),
    #[error("at least one variation is required")]
    NoVariations,
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityMetric {
    TotalCost,
    AverageUtilization,
    SuccessProbability,
    AverageDelay,
}

impl SensitivityMetric {
    pub fn value(&self, result: &ScenarioResult) -> f64 {
        match self {
            SensitivityMetric::TotalCost => result.cost.total_projected_cost,
            SensitivityMetric::AverageUtilization => result.utilization.average_utilization,
            SensitivityMetric::SuccessProbability => result.risk.success_probability,
            SensitivityMetric::AverageDelay => result.timeline.average_delay_days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityPoint {
    /// Relative change applied to the parameter, e.g. `0.1` for +10%.
    pub variation: f64,
    pub parameter_value: f64,
    pub metric_value: f64,
    /// Change of the metric relative to the baseline metric.
    pub normalized_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSensitivity {
    pub parameter_id: String,
    pub baseline_value: f64,
    pub points: Vec<SensitivityPoint>,
    /// Mean absolute normalized change over all variations.
    pub sensitivity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityReport {
    pub scenario_id: String,
    pub metric: SensitivityMetric,
    pub baseline_metric: f64,
    /// Most sensitive first.
    pub parameters: Vec<ParameterSensitivity>,
}

/// Perturbs each named parameter by each relative variation and measures how
/// far `metric` moves. All evaluations share `seed`, so the Monte Carlo noise
/// is the same for every run and only the perturbation shows.
pub fn run_sensitivity_analysis(
    input: &EvaluationInput<'_>,
    config: &EngineConfig,
    parameter_ids: &[String],
    variations: &[f64],
    metric: SensitivityMetric,
    seed: u64,
) -> Result<SensitivityReport, SensitivityError> {
    if variations.is_empty() {
        return Err(SensitivityError::NoVariations);
    }
    let baseline = evaluate_scenario_seeded(input, config, seed)?.result;
    let baseline_metric = metric.value(&baseline);

    let mut parameters = parameter_ids
        .iter()
        .map(|parameter_id| {
            analyze_parameter(input, config, parameter_id, variations, metric, seed, baseline_metric)
        })
        .collect::<Result<Vec<_>, _>>()?;
    parameters.sort_by(|a, b| {
        b.sensitivity
            .partial_cmp(&a.sensitivity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(SensitivityReport {
        scenario_id: input.scenario.id.clone(),
        metric,
        baseline_metric,
        parameters,
    })
}

fn analyze_parameter(
    input: &EvaluationInput<'_>,
    config: &EngineConfig,
    parameter_id: &str,
    variations: &[f64],
    metric: SensitivityMetric,
    seed: u64,
    baseline_metric: f64,
) -> Result<ParameterSensitivity, SensitivityError> {
    let parameter = input
        .scenario
        .parameter(parameter_id)
        .ok_or_else(|| SensitivityError::UnknownParameter(parameter_id.to_string()))?;
    let baseline_value = parameter
        .value
        .as_f64()
        .ok_or_else(|| SensitivityError::NotNumeric(parameter_id.to_string()))?;

    let mut points = Vec::with_capacity(variations.len());
    for variation in variations {
        let perturbed = perturb(input.scenario, parameter_id, baseline_value * (1.0 + variation));
        let parameter_value = perturbed
            .parameter(parameter_id)
            .and_then(|parameter| parameter.value.as_f64())
            .unwrap_or(baseline_value);
        let perturbed_input = EvaluationInput {
            scenario: &perturbed,
            ..*input
        };
        let result = evaluate_scenario_seeded(&perturbed_input, config, seed)?.result;
        let metric_value = metric.value(&result);
        points.push(SensitivityPoint {
            variation: *variation,
            parameter_value,
            metric_value,
            normalized_change: normalized_change(baseline_metric, metric_value),
        });
    }

    let sensitivity = mean(
        &points
            .iter()
            .map(|point| point.normalized_change.abs())
            .collect::<Vec<_>>(),
    );
    debug!(parameter = parameter_id, sensitivity, "parameter analyzed");
    Ok(ParameterSensitivity {
        parameter_id: parameter_id.to_string(),
        baseline_value,
        points,
        sensitivity,
    })
}

/// A copy of the scenario with one parameter set to `value`, held inside the
/// parameter's declared bounds.
fn perturb(scenario: &Scenario, parameter_id: &str, value: f64) -> Scenario {
    let mut perturbed = scenario.clone();
    if let Some(parameter) = perturbed.parameter_mut(parameter_id) {
        let min = parameter.min.unwrap_or(f64::MIN);
        let max = parameter.max.unwrap_or(f64::MAX);
        parameter.value = parameter.value.with_numeric(value.clamp(min.min(max), max.max(min)));
    }
    perturbed
}

fn normalized_change(baseline: f64, value: f64) -> f64 {
    if baseline.abs() > f64::EPSILON {
        (value - baseline) / baseline.abs()
    } else {
        value - baseline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parameter::{ParameterKind, ParameterValue, ScenarioParameter};
    use crate::test_support::{build_project, build_scenario, on_date};

    fn scenario() -> Scenario {
        let mut scenario = build_scenario(
            "S1",
            vec![build_project("P1", on_date(2026, 1, 1), on_date(2026, 1, 10), 5.0)],
        );
        scenario.parameters = vec![
            ScenarioParameter::new(
                "team",
                ParameterKind::TeamSizeMultiplier,
                ParameterValue::Number(1.0),
            ),
            ScenarioParameter::new(
                "buffer",
                ParameterKind::TimelineBuffer,
                ParameterValue::Number(0.0),
            ),
            ScenarioParameter::new(
                "include",
                ParameterKind::ProjectInclusion {
                    project_id: "P1".to_string(),
                },
                ParameterValue::Boolean(true),
            ),
        ];
        scenario
    }

    fn config() -> EngineConfig {
        EngineConfig {
            total_capacity: 10.0,
            monte_carlo_iterations: 100,
            ..EngineConfig::default()
        }
    }

    fn analyze(
        scenario: &Scenario,
        parameter_ids: &[&str],
    ) -> Result<SensitivityReport, SensitivityError> {
        let input = EvaluationInput {
            scenario,
            allocations: &[],
            committed: &[],
            horizon_days: 60,
        };
        let ids: Vec<String> = parameter_ids.iter().map(|id| id.to_string()).collect();
        run_sensitivity_analysis(
            &input,
            &config(),
            &ids,
            &[-0.2, 0.2],
            SensitivityMetric::TotalCost,
            7,
        )
    }

    #[test]
    fn cost_moves_with_team_size() {
        let report = analyze(&scenario(), &["buffer", "team"]).unwrap();
        assert!((report.baseline_metric - 32_000.0).abs() < 1e-6);

        let team = &report.parameters[0];
        assert_eq!(team.parameter_id, "team");
        assert!((team.sensitivity - 0.2).abs() < 1e-9);
        assert!((team.points[0].normalized_change + 0.2).abs() < 1e-9);
        assert!((team.points[1].parameter_value - 1.2).abs() < 1e-12);
    }

    #[test]
    fn a_zero_parameter_has_no_effect() {
        let report = analyze(&scenario(), &["buffer"]).unwrap();
        assert_eq!(report.parameters[0].sensitivity, 0.0);
    }

    #[test]
    fn declared_bounds_hold_during_perturbation() {
        let mut scenario = scenario();
        scenario.parameters[0] = scenario.parameters[0].clone().with_range(0.9, 1.1);
        let report = analyze(&scenario, &["team"]).unwrap();
        let values: Vec<f64> = report.parameters[0]
            .points
            .iter()
            .map(|point| point.parameter_value)
            .collect();
        assert_eq!(values, vec![0.9, 1.1]);
    }

    #[test]
    fn bad_parameters_are_reported() {
        assert_eq!(
            analyze(&scenario(), &["missing"]),
            Err(SensitivityError::UnknownParameter("missing".to_string()))
        );
        assert_eq!(
            analyze(&scenario(), &["include"]),
            Err(SensitivityError::NotNumeric("include".to_string()))
        );
    }
}
