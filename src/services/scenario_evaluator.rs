use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::allocation::{Allocation, ScenarioAllocation};
use crate::domain::demand::{DemandCurve, ProjectDemandProfile};
use crate::domain::parameter::{ParameterError, ParameterKind};
use crate::domain::scenario::{Scenario, ScenarioConstraint, ScenarioProject};
use crate::domain::time_window::MAX_HORIZON_DAYS;
use crate::services::conflict_detector::find_conflicts;
use crate::services::demand_aggregator::{aggregate, peak_demand, skill_bottlenecks};
use crate::services::demand_templates::demand_profile;
use crate::services::engine_config_yaml::EngineConfig;
use crate::services::evaluation_types::{
    CapacityForecastSummary, ConstraintViolation, CostAnalysis, DemandSummary,
    OverallocatedSkill, ScenarioEvaluation, ScenarioResult, SkillGap, SkillUtilization,
    UtilizationMetrics, UtilizationPeak, UtilizationSeverity, ViolationSeverity,
};
use crate::services::forecast_engine::{forecast, history_from_allocations};
use crate::services::risk_simulation::{
    RiskProject, RiskSimulationError, run_risk_simulation_with_rng,
};
use crate::services::statistics::mean;
use crate::services::timeline_analysis::{
    TimelineAnalysis, TimelineError, analyze_timeline, validate_dependencies,
};

pub const DEFAULT_HORIZON_DAYS: usize = 365;
const UNDERUTILIZED_BELOW: f64 = 0.5;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("evaluation horizon must be between 1 and {} days", MAX_HORIZON_DAYS)]
    InvalidHorizon,
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    #[error(transparent)]
    Timeline(#[from] TimelineError),
    #[error(transparent)]
    Risk(#[from] RiskSimulationError),
}

/// Everything one evaluation reads.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationInput<'a> {
    pub scenario: &'a Scenario,
    /// Hypothetical allocations belonging to the scenario.
    pub allocations: &'a [ScenarioAllocation],
    /// Committed allocations outside the scenario, used as forecast history.
    pub committed: &'a [Allocation],
    pub horizon_days: usize,
}

/// A project after the scenario's parameters were applied.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveProject {
    pub project: ScenarioProject,
    pub probability: f64,
    pub included: bool,
}

/// A seed for runs that did not ask for one. Logged so the run can be repeated.
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| {
        let seed = rand::random();
        info!(seed, "no seed configured, drew one");
        seed
    })
}

pub fn evaluate_scenario_seeded(
    input: &EvaluationInput<'_>,
    config: &EngineConfig,
    seed: u64,
) -> Result<ScenarioEvaluation, EvaluationError> {
    let mut rng = StdRng::seed_from_u64(seed);
    evaluate_scenario_with_rng(input, config, &mut rng)
}

pub fn evaluate_scenario_with_rng<R: Rng + ?Sized>(
    input: &EvaluationInput<'_>,
    config: &EngineConfig,
    rng: &mut R,
) -> Result<ScenarioEvaluation, EvaluationError> {
    let scenario = input.scenario;
    if !(1..=MAX_HORIZON_DAYS).contains(&input.horizon_days) {
        return Err(EvaluationError::InvalidHorizon);
    }
    for parameter in &scenario.parameters {
        parameter.validate()?;
    }
    validate_dependencies(&scenario.projects)?;
    info!(
        scenario = %scenario.id,
        horizon_days = input.horizon_days,
        projects = scenario.projects.len(),
        "evaluating scenario"
    );

    let effective = apply_parameters(scenario, config.inclusion_threshold);
    let (included, excluded): (Vec<&EffectiveProject>, Vec<&EffectiveProject>) =
        effective.iter().partition(|project| project.included);
    let profiles: Vec<ProjectDemandProfile> = included
        .iter()
        .map(|project| demand_profile(&project.project))
        .collect();
    let curve = aggregate(&profiles, scenario.base_date, input.horizon_days);

    let committed = forecast_committed_load(input, config);
    let committed_load = committed
        .as_ref()
        .map(|(load, _)| load.clone())
        .unwrap_or_else(|| vec![0.0; curve.days.len()]);
    let overall = overall_utilization(&curve, &committed_load, config);
    let utilization = utilization_metrics(&curve, &overall, config);

    let risk_projects: Vec<RiskProject> = included
        .iter()
        .zip(&profiles)
        .map(|(project, profile)| RiskProject {
            id: project.project.id.clone(),
            start_offset_days: project
                .project
                .start_date
                .signed_duration_since(scenario.base_date)
                .num_days() as f64,
            duration_days: project.project.duration_days() as f64,
            base_cost: profile_fte_days(profile) * config.daily_rate,
            probability: project.probability,
        })
        .collect();
    let risk = run_risk_simulation_with_rng(&risk_projects, config.monte_carlo_iterations, rng)?;

    let included_projects: Vec<ScenarioProject> = included
        .iter()
        .map(|project| project.project.clone())
        .collect();
    let timeline = analyze_timeline(&included_projects, &risk.duration_multiplier_p85)?;
    let cost = cost_analysis(scenario, &curve, input.allocations, config);

    let violations = scenario
        .constraints
        .iter()
        .filter_map(|constraint| {
            check_constraint(
                constraint,
                &ConstraintInputs {
                    scenario,
                    curve: &curve,
                    overall: &overall,
                    config,
                    cost: &cost,
                    timeline: &timeline,
                },
            )
        })
        .collect::<Vec<_>>();

    let total_fte_days = curve.total_fte_days();
    let result = ScenarioResult {
        scenario_id: scenario.id.clone(),
        scenario_name: scenario.name.clone(),
        base_date: scenario.base_date,
        horizon_days: input.horizon_days,
        included_projects: included.iter().map(|p| p.project.id.clone()).collect(),
        excluded_projects: excluded.iter().map(|p| p.project.id.clone()).collect(),
        utilization,
        demand: DemandSummary {
            total_fte_days,
            average_daily_demand: total_fte_days / curve.days.len().max(1) as f64,
            peak: peak_demand(&curve),
            bottlenecks: skill_bottlenecks(&curve),
        },
        capacity_forecast: committed.map(|(_, summary)| summary),
        violations,
        risk: risk.assessment,
        cost,
        timeline,
        conflicts: find_conflicts(input.allocations),
        skill_gaps: skill_gaps(&curve, config),
    };
    debug!(
        scenario = %result.scenario_id,
        errors = result.error_count(),
        warnings = result.warning_count(),
        total_cost = result.cost.total_projected_cost,
        "scenario evaluated"
    );

    Ok(ScenarioEvaluation {
        result,
        duration_samples: risk.durations,
    })
}

/// Applies team-size multipliers, timeline buffers, probability overrides
/// and inclusion flags. Projects go ahead when forced in, or when their
/// probability reaches `inclusion_threshold` and they are not forced out.
pub fn apply_parameters(scenario: &Scenario, inclusion_threshold: f64) -> Vec<EffectiveProject> {
    let mut team_multiplier = 1.0;
    let mut buffer = 0.0;
    let mut probabilities: HashMap<&str, f64> = HashMap::new();
    let mut inclusions: HashMap<&str, bool> = HashMap::new();

    for parameter in &scenario.parameters {
        match &parameter.kind {
            ParameterKind::TeamSizeMultiplier => {
                if let Some(value) = parameter.value.as_fraction() {
                    team_multiplier *= value.max(0.0);
                }
            }
            ParameterKind::TimelineBuffer => {
                if let Some(value) = parameter.value.as_fraction() {
                    buffer += value.max(0.0);
                }
            }
            ParameterKind::ProjectProbability { project_id } => {
                if let Some(value) = parameter.value.as_fraction() {
                    probabilities.insert(project_id.as_str(), value.clamp(0.0, 1.0));
                }
            }
            ParameterKind::ProjectInclusion { project_id } => {
                if let Some(value) = parameter.value.as_bool() {
                    inclusions.insert(project_id.as_str(), value);
                }
            }
            ParameterKind::BudgetCeiling | ParameterKind::Custom => {}
        }
    }

    scenario
        .projects
        .iter()
        .map(|project| {
            let probability = probabilities
                .get(project.id.as_str())
                .copied()
                .unwrap_or(project.probability)
                .clamp(0.0, 1.0);
            let included = inclusions
                .get(project.id.as_str())
                .copied()
                .unwrap_or(probability >= inclusion_threshold);
            EffectiveProject {
                project: adjust_project(project, team_multiplier, buffer),
                probability,
                included,
            }
        })
        .collect()
}

fn adjust_project(project: &ScenarioProject, team_multiplier: f64, buffer: f64) -> ScenarioProject {
    let factor = 1.0 + buffer;
    let origin = project.start_date;
    let mut adjusted = project.clone();
    adjusted.team_size = project.team_size * team_multiplier;
    adjusted.end_date = stretch_end(origin, project.end_date, factor).max(origin);
    for phase in &mut adjusted.phases {
        phase.team_size *= team_multiplier;
        let start = stretch(origin, phase.start_date, factor);
        phase.end_date = stretch_end(origin, phase.end_date, factor).max(start);
        phase.start_date = start;
    }
    adjusted
}

fn stretch(origin: NaiveDate, date: NaiveDate, factor: f64) -> NaiveDate {
    let offset = date.signed_duration_since(origin).num_days() as f64;
    origin + Duration::days((offset * factor).round() as i64)
}

/// Stretches the exclusive end so adjacent phases stay adjacent.
fn stretch_end(origin: NaiveDate, end: NaiveDate, factor: f64) -> NaiveDate {
    stretch(origin, end + Duration::days(1), factor) - Duration::days(1)
}

fn profile_fte_days(profile: &ProjectDemandProfile) -> f64 {
    profile
        .phases
        .iter()
        .map(|phase| phase.daily_demand() * phase.window().duration_days().unwrap_or(1) as f64)
        .sum()
}

/// Forecast of already committed load over the horizon, one value per day.
/// Degrades to `None` when there is no usable history.
fn forecast_committed_load(
    input: &EvaluationInput<'_>,
    config: &EngineConfig,
) -> Option<(Vec<f64>, CapacityForecastSummary)> {
    if input.committed.is_empty() {
        return None;
    }
    let history = history_from_allocations(
        input.committed,
        input.scenario.base_date,
        config.history_lookback_days,
    );
    match forecast(&history, input.horizon_days) {
        Ok(result) => {
            let load = result.predicted_values();
            let summary = CapacityForecastSummary {
                trend: result.metadata.trend,
                confidence: result.metadata.confidence,
                has_seasonality: result.metadata.has_seasonality,
                average_committed_load: mean(&load),
                peak_committed_load: load.iter().copied().fold(0.0, f64::max),
                sample_count: result.metadata.sample_count,
            };
            Some((load, summary))
        }
        Err(error) => {
            warn!(
                scenario = %input.scenario.id,
                %error,
                "committed load forecast unavailable, evaluating without it"
            );
            None
        }
    }
}

fn overall_utilization(curve: &DemandCurve, committed_load: &[f64], config: &EngineConfig) -> Vec<f64> {
    curve
        .days
        .iter()
        .enumerate()
        .map(|(index, day)| {
            let committed = committed_load.get(index).copied().unwrap_or(0.0);
            (day.total + committed) / config.total_capacity
        })
        .collect()
}

fn utilization_metrics(
    curve: &DemandCurve,
    overall: &[f64],
    config: &EngineConfig,
) -> UtilizationMetrics {
    let mut skills = Vec::new();
    let mut underutilized_skills = Vec::new();
    let mut overallocated_skills = Vec::new();
    for (skill, capacity) in config.skill_capacity.iter().filter(|(_, c)| **c > 0.0) {
        let series: Vec<f64> = curve
            .skill_series(skill)
            .into_iter()
            .map(|demand| demand / capacity)
            .collect();
        let mean_utilization = mean(&series);
        let over: Vec<f64> = series
            .iter()
            .filter(|utilization| **utilization > 1.0)
            .map(|utilization| utilization - 1.0)
            .collect();
        if mean_utilization < UNDERUTILIZED_BELOW {
            underutilized_skills.push(skill.clone());
        }
        if !over.is_empty() {
            overallocated_skills.push(OverallocatedSkill {
                skill: skill.clone(),
                days_over_capacity: over.len(),
                mean_excess: mean(&over),
            });
        }
        skills.push(SkillUtilization {
            skill: skill.clone(),
            capacity: *capacity,
            mean_utilization,
            peak_utilization: series.iter().copied().fold(0.0, f64::max),
        });
    }

    UtilizationMetrics {
        total_capacity: config.total_capacity,
        average_utilization: mean(overall),
        peak_utilization: overall.iter().copied().fold(0.0, f64::max),
        peaks: utilization_peaks(curve, overall),
        skills,
        underutilized_skills,
        overallocated_skills,
    }
}

/// Merges consecutive days above 90% into one peak, graded by its highest day.
fn utilization_peaks(curve: &DemandCurve, overall: &[f64]) -> Vec<UtilizationPeak> {
    let mut runs: Vec<(NaiveDate, NaiveDate, f64)> = Vec::new();
    let mut open = false;
    for (day, utilization) in curve.days.iter().zip(overall) {
        if UtilizationSeverity::classify(*utilization).is_none() {
            open = false;
            continue;
        }
        match runs.last_mut() {
            Some(run) if open => {
                run.1 = day.date;
                run.2 = run.2.max(*utilization);
            }
            _ => runs.push((day.date, day.date, *utilization)),
        }
        open = true;
    }
    runs.into_iter()
        .filter_map(|(start, end, peak)| {
            UtilizationSeverity::classify(peak).map(|severity| UtilizationPeak {
                start,
                end,
                peak_utilization: peak,
                severity,
            })
        })
        .collect()
}

/// Peak demand against configured capacity for every skill that has either,
/// largest shortfall first.
pub fn skill_gaps(curve: &DemandCurve, config: &EngineConfig) -> Vec<SkillGap> {
    let skills: BTreeSet<String> = curve
        .skills()
        .into_iter()
        .chain(config.skill_capacity.keys().cloned())
        .collect();
    let mut gaps: Vec<SkillGap> = skills
        .into_iter()
        .map(|skill| {
            let capacity = config.skill_capacity.get(&skill).copied().unwrap_or(0.0);
            let series = curve.skill_series(&skill);
            let peak = series.iter().copied().fold(0.0, f64::max);
            let severity = if capacity > 0.0 {
                UtilizationSeverity::classify(peak / capacity)
            } else if peak > 0.0 {
                Some(UtilizationSeverity::High)
            } else {
                None
            };
            SkillGap {
                average_demand: mean(&series),
                peak_demand: peak,
                gap: peak - capacity,
                capacity,
                severity,
                skill,
            }
        })
        .collect();
    gaps.sort_by(|a, b| b.gap.partial_cmp(&a.gap).unwrap_or(std::cmp::Ordering::Equal));
    gaps
}

fn cost_analysis(
    scenario: &Scenario,
    curve: &DemandCurve,
    allocations: &[ScenarioAllocation],
    config: &EngineConfig,
) -> CostAnalysis {
    let daily_costs: Vec<f64> = curve
        .days
        .iter()
        .map(|day| day.total * config.daily_rate)
        .collect();
    let mut by_project: BTreeMap<String, f64> = BTreeMap::new();
    for day in &curve.days {
        for (project, demand) in &day.by_project {
            *by_project.entry(project.clone()).or_insert(0.0) += demand * config.daily_rate;
        }
    }

    let horizon = curve.horizon();
    let allocation_cost: f64 = allocations
        .iter()
        .map(|allocation| allocation.estimated_cost(&horizon, config.hours_per_day))
        .sum();
    let demand_cost: f64 = daily_costs.iter().sum();
    let total_projected_cost = demand_cost + allocation_cost;
    let budget = scenario.declared_budget();
    let budget_variance = budget.map(|budget| budget - total_projected_cost);
    let budget_variance_percent = budget
        .zip(budget_variance)
        .filter(|(budget, _)| *budget > 0.0)
        .map(|(budget, variance)| variance / budget * 100.0);

    CostAnalysis {
        daily_rate: config.daily_rate,
        demand_cost,
        allocation_cost,
        total_projected_cost,
        average_daily_cost: mean(&daily_costs),
        peak_daily_cost: daily_costs.iter().copied().fold(0.0, f64::max),
        by_project,
        budget,
        budget_variance,
        budget_variance_percent,
    }
}

struct ConstraintInputs<'a> {
    scenario: &'a Scenario,
    curve: &'a DemandCurve,
    overall: &'a [f64],
    config: &'a EngineConfig,
    cost: &'a CostAnalysis,
    timeline: &'a TimelineAnalysis,
}

fn violation(
    constraint: &ScenarioConstraint,
    severity: ViolationSeverity,
    description: String,
    suggested_actions: &[&str],
) -> ConstraintViolation {
    ConstraintViolation {
        constraint_type: constraint.type_name().to_string(),
        severity,
        description,
        suggested_actions: suggested_actions.iter().map(|s| s.to_string()).collect(),
    }
}

fn check_constraint(
    constraint: &ScenarioConstraint,
    inputs: &ConstraintInputs<'_>,
) -> Option<ConstraintViolation> {
    match constraint {
        ScenarioConstraint::ResourceLimit {
            skill: None,
            max_utilization,
        } => check_utilization_limit(constraint, "overall", inputs.overall, *max_utilization),
        ScenarioConstraint::ResourceLimit {
            skill: Some(skill),
            max_utilization,
        } => {
            let demand = inputs.curve.skill_series(skill);
            let capacity = inputs.config.skill_capacity.get(skill).copied().unwrap_or(0.0);
            if capacity <= 0.0 {
                return demand.iter().any(|value| *value > 0.0).then(|| {
                    violation(
                        constraint,
                        ViolationSeverity::Error,
                        format!("skill {skill} is in demand but has no configured capacity"),
                        &["configure capacity for the skill", "hire or train for the skill"],
                    )
                });
            }
            let series: Vec<f64> = demand.iter().map(|value| value / capacity).collect();
            check_utilization_limit(constraint, skill, &series, *max_utilization)
        }
        ScenarioConstraint::BudgetLimit { max_total_cost } => {
            let total = inputs.cost.total_projected_cost;
            (total > *max_total_cost).then(|| {
                let severity = if total > max_total_cost * 1.1 {
                    ViolationSeverity::Error
                } else {
                    ViolationSeverity::Warning
                };
                violation(
                    constraint,
                    severity,
                    format!("projected cost {total:.0} exceeds budget {max_total_cost:.0}"),
                    &[
                        "reduce team sizes on lower-priority projects",
                        "drop or defer optional projects",
                    ],
                )
            })
        }
        ScenarioConstraint::Timeline {
            deadline,
            project_id,
        } => check_deadline(constraint, inputs, *deadline, project_id.as_deref()),
        ScenarioConstraint::SkillAvailability {
            skill,
            min_capacity,
        } => {
            let capacity = inputs.config.skill_capacity.get(skill).copied().unwrap_or(0.0);
            let peak = inputs
                .curve
                .skill_series(skill)
                .into_iter()
                .fold(0.0, f64::max);
            if capacity < *min_capacity {
                Some(violation(
                    constraint,
                    ViolationSeverity::Error,
                    format!("{skill} capacity {capacity:.1} FTE is below the required {min_capacity:.1}"),
                    &["hire for the skill", "train existing staff", "engage contractors"],
                ))
            } else if peak > capacity {
                Some(violation(
                    constraint,
                    ViolationSeverity::Warning,
                    format!("{skill} demand peaks at {peak:.1} FTE against {capacity:.1} available"),
                    &["stagger projects needing the skill", "engage contractors"],
                ))
            } else {
                None
            }
        }
    }
}

fn check_utilization_limit(
    constraint: &ScenarioConstraint,
    label: &str,
    series: &[f64],
    max_utilization: f64,
) -> Option<ConstraintViolation> {
    let days_over = series.iter().filter(|value| **value > max_utilization).count();
    if days_over == 0 {
        return None;
    }
    let peak = series.iter().copied().fold(0.0, f64::max);
    let severity = if peak > max_utilization * 1.2 {
        ViolationSeverity::Error
    } else {
        ViolationSeverity::Warning
    };
    Some(violation(
        constraint,
        severity,
        format!(
            "{label} utilization peaks at {:.0}% (limit {:.0}%) on {days_over} days",
            peak * 100.0,
            max_utilization * 100.0
        ),
        &[
            "add capacity or contractors",
            "extend the timeline buffer to flatten demand",
            "defer lower-priority projects",
        ],
    ))
}

fn check_deadline(
    constraint: &ScenarioConstraint,
    inputs: &ConstraintInputs<'_>,
    deadline: NaiveDate,
    project_id: Option<&str>,
) -> Option<ConstraintViolation> {
    if let Some(id) = project_id {
        let evaluated = inputs.timeline.projects.iter().any(|p| p.project_id == id);
        if !evaluated && inputs.scenario.project(id).is_none() {
            return Some(violation(
                constraint,
                ViolationSeverity::Warning,
                format!("deadline refers to unknown project {id}"),
                &["fix the project id in the constraint"],
            ));
        }
    }
    let projects = inputs
        .timeline
        .projects
        .iter()
        .filter(|timeline| project_id.is_none_or(|id| timeline.project_id == id));

    let mut planned_late = Vec::new();
    let mut slipping = Vec::new();
    for timeline in projects {
        if timeline.planned_end > deadline {
            planned_late.push(timeline.project_id.as_str());
        } else if timeline.estimated_end > deadline {
            slipping.push(timeline.project_id.as_str());
        }
    }

    if !planned_late.is_empty() {
        Some(violation(
            constraint,
            ViolationSeverity::Error,
            format!("{} planned to end after {deadline}", planned_late.join(", ")),
            &["move the deadline", "start the projects earlier", "add capacity"],
        ))
    } else if !slipping.is_empty() {
        Some(violation(
            constraint,
            ViolationSeverity::Warning,
            format!("{} likely to slip past {deadline}", slipping.join(", ")),
            &["add a timeline buffer", "reduce scope", "resolve dependency delays"],
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parameter::{ParameterValue, ScenarioParameter};
    use crate::test_support::{build_project, build_scenario, build_scenario_allocation, on_date};

    fn config(total_capacity: f64) -> EngineConfig {
        EngineConfig {
            total_capacity,
            monte_carlo_iterations: 200,
            ..EngineConfig::default()
        }
    }

    fn evaluate(scenario: &Scenario, config: &EngineConfig) -> ScenarioResult {
        let input = EvaluationInput {
            scenario,
            allocations: &[],
            committed: &[],
            horizon_days: 365,
        };
        evaluate_scenario_seeded(&input, config, 42).unwrap().result
    }

    // Team of 5 at the default 0.8 utilization demands 4 FTE a day.
    fn january_scenario() -> Scenario {
        build_scenario(
            "S1",
            vec![build_project("P1", on_date(2026, 1, 1), on_date(2026, 1, 10), 5.0)],
        )
    }

    #[test]
    fn utilization_is_demand_over_capacity() {
        let result = evaluate(&january_scenario(), &config(5.0));
        assert!((result.utilization.peak_utilization - 0.8).abs() < 1e-9);
        assert!(result.utilization.peaks.is_empty());
        assert_eq!(result.included_projects, vec!["P1".to_string()]);
        assert!((result.demand.total_fte_days - 40.0).abs() < 1e-9);
    }

    #[test]
    fn consecutive_overloaded_days_merge_into_one_peak() {
        let result = evaluate(&january_scenario(), &config(3.5));
        assert_eq!(result.utilization.peaks.len(), 1);
        let peak = &result.utilization.peaks[0];
        assert_eq!(peak.start, on_date(2026, 1, 1));
        assert_eq!(peak.end, on_date(2026, 1, 10));
        assert_eq!(peak.severity, UtilizationSeverity::Medium);
    }

    #[test]
    fn team_multiplier_scales_demand() {
        let mut scenario = january_scenario();
        scenario.parameters.push(ScenarioParameter::new(
            "team",
            ParameterKind::TeamSizeMultiplier,
            ParameterValue::Number(1.5),
        ));
        let result = evaluate(&scenario, &config(10.0));
        assert!((result.utilization.peak_utilization - 0.6).abs() < 1e-9);
    }

    #[test]
    fn timeline_buffer_extends_the_project() {
        let mut scenario = january_scenario();
        scenario.parameters.push(ScenarioParameter::new(
            "buffer",
            ParameterKind::TimelineBuffer,
            ParameterValue::Percentage(20.0),
        ));
        let effective = apply_parameters(&scenario, 0.5);
        assert_eq!(effective[0].project.end_date, on_date(2026, 1, 12));

        let result = evaluate(&scenario, &config(5.0));
        assert!((result.demand.total_fte_days - 48.0).abs() < 1e-9);
    }

    #[test]
    fn buffered_phases_stay_adjacent() {
        let mut project = build_project("P1", on_date(2026, 1, 1), on_date(2026, 1, 10), 5.0);
        project.phases = crate::services::demand_templates::synthesize_phases(&{
            let mut software = project.clone();
            software.project_type = crate::domain::scenario::ProjectType::Software;
            software
        });
        let adjusted = adjust_project(&project, 1.0, 0.5);
        for pair in adjusted.phases.windows(2) {
            assert_eq!(pair[0].end_date + Duration::days(1), pair[1].start_date);
        }
        assert_eq!(adjusted.phases.last().unwrap().end_date, adjusted.end_date);
        assert_eq!(adjusted.end_date, on_date(2026, 1, 15));
    }

    #[test]
    fn unlikely_projects_are_left_out_unless_forced_in() {
        let mut unlikely = build_project("P2", on_date(2026, 2, 1), on_date(2026, 2, 10), 5.0);
        unlikely.probability = 0.3;
        let mut scenario = january_scenario();
        scenario.projects.push(unlikely);

        let result = evaluate(&scenario, &config(5.0));
        assert_eq!(result.excluded_projects, vec!["P2".to_string()]);

        scenario.parameters.push(ScenarioParameter::new(
            "force",
            ParameterKind::ProjectInclusion {
                project_id: "P2".to_string(),
            },
            ParameterValue::Boolean(true),
        ));
        let result = evaluate(&scenario, &config(5.0));
        assert!(result.excluded_projects.is_empty());
        assert!(result.risk.success_probability < 0.5);
    }

    #[test]
    fn probability_parameter_overrides_the_project() {
        let mut scenario = january_scenario();
        scenario.parameters.push(ScenarioParameter::new(
            "p1",
            ParameterKind::ProjectProbability {
                project_id: "P1".to_string(),
            },
            ParameterValue::Percentage(20.0),
        ));
        let effective = apply_parameters(&scenario, 0.5);
        assert_eq!(effective[0].probability, 0.2);
        assert!(!effective[0].included);
    }

    #[test]
    fn cost_combines_demand_and_allocations() {
        let scenario = january_scenario();
        let mut allocation = build_scenario_allocation(
            "A1",
            "E1",
            "P1",
            50.0,
            on_date(2026, 1, 1),
            Some(on_date(2026, 1, 10)),
        );
        allocation.hourly_rate = Some(100.0);
        let input = EvaluationInput {
            scenario: &scenario,
            allocations: std::slice::from_ref(&allocation),
            committed: &[],
            horizon_days: 365,
        };
        let result = evaluate_scenario_seeded(&input, &config(5.0), 1).unwrap().result;

        // 4 FTE * 10 days * 800
        assert!((result.cost.demand_cost - 32_000.0).abs() < 1e-6);
        assert!((result.cost.allocation_cost - 4_000.0).abs() < 1e-6);
        assert!((result.cost.total_projected_cost - 36_000.0).abs() < 1e-6);
        assert!((result.cost.by_project["P1"] - 32_000.0).abs() < 1e-6);
    }

    #[test]
    fn budget_overrun_is_an_error_violation() {
        let mut scenario = january_scenario();
        scenario.constraints.push(ScenarioConstraint::BudgetLimit {
            max_total_cost: 20_000.0,
        });
        let result = evaluate(&scenario, &config(5.0));
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.violations[0].constraint_type, "budget_limit");
        assert!(!result.violations[0].suggested_actions.is_empty());
        assert_eq!(result.cost.budget_variance, Some(-12_000.0));
    }

    #[test]
    fn missed_deadline_and_skill_shortage_are_reported() {
        let mut scenario = january_scenario();
        scenario.constraints.push(ScenarioConstraint::Timeline {
            deadline: on_date(2026, 1, 5),
            project_id: Some("P1".to_string()),
        });
        scenario.constraints.push(ScenarioConstraint::SkillAvailability {
            skill: "engineering".to_string(),
            min_capacity: 2.0,
        });
        let mut config = config(5.0);
        config.skill_capacity.insert("engineering".to_string(), 3.0);

        let result = evaluate(&scenario, &config);
        let types: Vec<(&str, ViolationSeverity)> = result
            .violations
            .iter()
            .map(|v| (v.constraint_type.as_str(), v.severity))
            .collect();
        assert_eq!(
            types,
            vec![
                ("timeline", ViolationSeverity::Error),
                ("skill_availability", ViolationSeverity::Warning),
            ]
        );
        assert_eq!(result.utilization.overallocated_skills[0].skill, "engineering");
        assert_eq!(result.skill_gaps[0].gap, 1.0);
    }

    #[test]
    fn resource_limit_checks_overall_utilization() {
        let mut scenario = january_scenario();
        scenario.constraints.push(ScenarioConstraint::ResourceLimit {
            skill: None,
            max_utilization: 0.9,
        });
        assert!(evaluate(&scenario, &config(5.0)).violations.is_empty());

        let result = evaluate(&scenario, &config(3.0));
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].severity, ViolationSeverity::Error);
    }

    #[test]
    fn committed_load_is_forecast_into_utilization() {
        let scenario = january_scenario();
        let committed = vec![Allocation {
            employee_id: "E9".to_string(),
            project_id: "OPS".to_string(),
            start_date: on_date(2025, 1, 1),
            end_date: None,
            allocation_percentage: 100.0,
            hourly_rate: None,
        }];
        let input = EvaluationInput {
            scenario: &scenario,
            allocations: &[],
            committed: &committed,
            horizon_days: 60,
        };
        let result = evaluate_scenario_seeded(&input, &config(5.0), 3).unwrap().result;

        let summary = result.capacity_forecast.unwrap();
        assert!((summary.average_committed_load - 1.0).abs() < 1e-9);
        assert!((result.utilization.peak_utilization - 1.0).abs() < 1e-9);
    }

    #[test]
    fn short_history_degrades_to_no_forecast() {
        let scenario = january_scenario();
        let committed = vec![Allocation {
            employee_id: "E9".to_string(),
            project_id: "OPS".to_string(),
            start_date: on_date(2025, 1, 1),
            end_date: None,
            allocation_percentage: 100.0,
            hourly_rate: None,
        }];
        let mut config = config(5.0);
        config.history_lookback_days = 5;
        let input = EvaluationInput {
            scenario: &scenario,
            allocations: &[],
            committed: &committed,
            horizon_days: 60,
        };
        let result = evaluate_scenario_seeded(&input, &config, 3).unwrap().result;
        assert!(result.capacity_forecast.is_none());
        assert!((result.utilization.peak_utilization - 0.8).abs() < 1e-9);
    }

    #[test]
    fn same_seed_gives_the_same_result() {
        let mut scenario = january_scenario();
        scenario.projects[0].probability = 0.7;
        let input = EvaluationInput {
            scenario: &scenario,
            allocations: &[],
            committed: &[],
            horizon_days: 90,
        };
        let first = evaluate_scenario_seeded(&input, &config(5.0), 9).unwrap();
        let second = evaluate_scenario_seeded(&input, &config(5.0), 9).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_inputs_fail_evaluation() {
        let scenario = january_scenario();
        let input = EvaluationInput {
            scenario: &scenario,
            allocations: &[],
            committed: &[],
            horizon_days: 0,
        };
        assert_eq!(
            evaluate_scenario_seeded(&input, &config(5.0), 1),
            Err(EvaluationError::InvalidHorizon)
        );
        let input = EvaluationInput {
            horizon_days: MAX_HORIZON_DAYS + 1,
            ..input
        };
        assert_eq!(
            evaluate_scenario_seeded(&input, &config(5.0), 1),
            Err(EvaluationError::InvalidHorizon)
        );

        let mut scenario = january_scenario();
        scenario.parameters.push(
            ScenarioParameter::new(
                "team",
                ParameterKind::TeamSizeMultiplier,
                ParameterValue::Number(3.0),
            )
            .with_range(0.5, 2.0),
        );
        let input = EvaluationInput {
            scenario: &scenario,
            allocations: &[],
            committed: &[],
            horizon_days: 30,
        };
        assert!(matches!(
            evaluate_scenario_seeded(&input, &config(5.0), 1),
            Err(EvaluationError::Parameter(_))
        ));
    }
}
