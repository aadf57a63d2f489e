use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::evaluation_types::ScenarioResult;

/// Which way a metric should move to be better.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Better {
    Lower,
    Higher,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricComparison {
    pub metric: String,
    pub value_a: f64,
    pub value_b: f64,
    /// `value_b - value_a`.
    pub delta: f64,
    pub percent_change: Option<f64>,
    /// Id of the better scenario, `None` on a tie.
    pub preferred: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub scenario_a: String,
    pub scenario_b: String,
    pub metrics: Vec<MetricComparison>,
    /// The scenario that wins more metrics, `None` when they split evenly.
    pub preferred: Option<String>,
    pub computed_at: DateTime<Utc>,
}

/// A comparison kept in the workspace between runs, stamped with the
/// `updated_at` of both scenarios it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredComparison {
    pub scenario_a_updated_at: DateTime<Utc>,
    pub scenario_b_updated_at: DateTime<Utc>,
    pub comparison: ScenarioComparison,
}

const TIE_TOLERANCE: f64 = 1e-9;

pub fn compare(a: &ScenarioResult, b: &ScenarioResult, computed_at: DateTime<Utc>) -> ScenarioComparison {
    let rows: [(&str, f64, f64, Better); 8] = [
        (
            "total_projected_cost",
            a.cost.total_projected_cost,
            b.cost.total_projected_cost,
            Better::Lower,
        ),
        (
            "average_utilization",
            a.utilization.average_utilization,
            b.utilization.average_utilization,
            Better::Lower,
        ),
        (
            "peak_utilization",
            a.utilization.peak_utilization,
            b.utilization.peak_utilization,
            Better::Lower,
        ),
        (
            "success_probability",
            a.risk.success_probability,
            b.risk.success_probability,
            Better::Higher,
        ),
        (
            "average_delay_days",
            a.timeline.average_delay_days,
            b.timeline.average_delay_days,
            Better::Lower,
        ),
        (
            "constraint_errors",
            a.error_count() as f64,
            b.error_count() as f64,
            Better::Lower,
        ),
        (
            "constraint_warnings",
            a.warning_count() as f64,
            b.warning_count() as f64,
            Better::Lower,
        ),
        (
            "allocation_conflicts",
            a.conflicts.len() as f64,
            b.conflicts.len() as f64,
            Better::Lower,
        ),
    ];

    let metrics: Vec<MetricComparison> = rows
        .into_iter()
        .map(|(metric, value_a, value_b, better)| {
            let delta = value_b - value_a;
            let preferred = if delta.abs() <= TIE_TOLERANCE {
                None
            } else if (delta < 0.0) == (better == Better::Lower) {
                Some(b.scenario_id.clone())
            } else {
                Some(a.scenario_id.clone())
            };
            MetricComparison {
                metric: metric.to_string(),
                value_a,
                value_b,
                delta,
                percent_change: (value_a.abs() > TIE_TOLERANCE).then(|| delta / value_a.abs() * 100.0),
                preferred,
            }
        })
        .collect();

    let wins_a = count_wins(&metrics, &a.scenario_id);
    let wins_b = count_wins(&metrics, &b.scenario_id);
    let preferred = match wins_a.cmp(&wins_b) {
        std::cmp::Ordering::Greater => Some(a.scenario_id.clone()),
        std::cmp::Ordering::Less => Some(b.scenario_id.clone()),
        std::cmp::Ordering::Equal => None,
    };

    ScenarioComparison {
        scenario_a: a.scenario_id.clone(),
        scenario_b: b.scenario_id.clone(),
        metrics,
        preferred,
        computed_at,
    }
}

fn count_wins(metrics: &[MetricComparison], scenario_id: &str) -> usize {
    metrics
        .iter()
        .filter(|metric| metric.preferred.as_deref() == Some(scenario_id))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::engine_config_yaml::EngineConfig;
    use crate::services::scenario_evaluator::{EvaluationInput, evaluate_scenario_seeded};
    use crate::test_support::{build_project, build_scenario, fixed_timestamp, on_date};

    fn result_for(id: &str, team_size: f64) -> ScenarioResult {
        let scenario = build_scenario(
            id,
            vec![build_project("P1", on_date(2026, 1, 1), on_date(2026, 1, 31), team_size)],
        );
        let input = EvaluationInput {
            scenario: &scenario,
            allocations: &[],
            committed: &[],
            horizon_days: 90,
        };
        let config = EngineConfig {
            monte_carlo_iterations: 50,
            ..EngineConfig::default()
        };
        evaluate_scenario_seeded(&input, &config, 11).unwrap().result
    }

    #[test]
    fn the_cheaper_scenario_wins() {
        let small = result_for("SMALL", 2.0);
        let large = result_for("LARGE", 6.0);
        let comparison = compare(&small, &large, fixed_timestamp());

        let cost = &comparison.metrics[0];
        assert_eq!(cost.metric, "total_projected_cost");
        assert!(cost.delta > 0.0);
        assert_eq!(cost.preferred.as_deref(), Some("SMALL"));
        assert!((cost.percent_change.unwrap() - 200.0).abs() < 1e-6);

        let success = &comparison.metrics[3];
        assert_eq!(success.preferred, None);
        assert_eq!(comparison.preferred.as_deref(), Some("SMALL"));
    }

    #[test]
    fn identical_results_tie() {
        let result = result_for("A", 3.0);
        let comparison = compare(&result, &result, fixed_timestamp());
        assert!(comparison.metrics.iter().all(|metric| metric.preferred.is_none()));
        assert_eq!(comparison.preferred, None);
    }
}
