use std::collections::BTreeMap;

use rand::Rng;
use rand_distr::{Bernoulli, Distribution, Uniform};
use serde::Serialize;
use thiserror::Error;

use crate::services::statistics::{DistributionSummary, percentile_f64, sort_f64};

pub const DEFAULT_ITERATIONS: usize = 1000;
pub const DURATION_MULTIPLIER_RANGE: (f64, f64) = (0.8, 1.2);
pub const COST_MULTIPLIER_RANGE: (f64, f64) = (0.85, 1.15);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskSimulationError {
    #[error("iterations must be greater than zero")]
    InvalidIterations,
    #[error("project {project_id} has probability {probability} outside 0-1")]
    InvalidProbability { project_id: String, probability: f64 },
}

/// One project as the simulation sees it, in days relative to the scenario
/// base date.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskProject {
    pub id: String,
    pub start_offset_days: f64,
    pub duration_days: f64,
    pub base_cost: f64,
    pub probability: f64,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub iterations: usize,
    pub success_probability: f64,
    /// Simulated end of the last project, days from the base date.
    pub duration: DistributionSummary,
    pub cost: DistributionSummary,
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskSimulationOutput {
    pub assessment: RiskAssessment,
    pub durations: Vec<f64>,
    pub costs: Vec<f64>,
    /// 85th percentile of each project's sampled duration multiplier.
    pub duration_multiplier_p85: BTreeMap<String, f64>,
}

pub fn run_risk_simulation_with_rng<R: Rng + ?Sized>(
    projects: &[RiskProject],
    iterations: usize,
    rng: &mut R,
) -> Result<RiskSimulationOutput, RiskSimulationError> {
    if iterations == 0 {
        return Err(RiskSimulationError::InvalidIterations);
    }
    let outcomes = projects
        .iter()
        .map(|project| {
            Bernoulli::new(project.probability).map_err(|_| {
                RiskSimulationError::InvalidProbability {
                    project_id: project.id.clone(),
                    probability: project.probability,
                }
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let duration_multiplier =
        Uniform::new_inclusive(DURATION_MULTIPLIER_RANGE.0, DURATION_MULTIPLIER_RANGE.1);
    let cost_multiplier = Uniform::new_inclusive(COST_MULTIPLIER_RANGE.0, COST_MULTIPLIER_RANGE.1);

    let mut durations = Vec::with_capacity(iterations);
    let mut costs = Vec::with_capacity(iterations);
    let mut multipliers: Vec<Vec<f64>> = vec![Vec::with_capacity(iterations); projects.len()];
    let mut successes = 0usize;

    for _ in 0..iterations {
        let mut end = 0.0_f64;
        let mut cost = 0.0_f64;
        let mut all_succeeded = true;
        for (index, project) in projects.iter().enumerate() {
            let duration_factor = duration_multiplier.sample(rng);
            let cost_factor = cost_multiplier.sample(rng);
            let succeeded = outcomes[index].sample(rng);

            multipliers[index].push(duration_factor);
            end = end.max(project.start_offset_days + project.duration_days * duration_factor);
            cost += project.base_cost * cost_factor;
            all_succeeded &= succeeded;
        }
        if all_succeeded {
            successes += 1;
        }
        durations.push(end);
        costs.push(cost);
    }

    let duration_multiplier_p85 = projects
        .iter()
        .zip(multipliers.iter_mut())
        .map(|(project, samples)| {
            sort_f64(samples);
            (project.id.clone(), percentile_f64(samples, 85.0))
        })
        .collect();

    let success_probability = successes as f64 / iterations as f64;
    let duration = DistributionSummary::from_samples(&durations);
    let cost = DistributionSummary::from_samples(&costs);
    let (risk_level, risk_factors) = classify_risk(projects, success_probability, &duration, &cost);

    Ok(RiskSimulationOutput {
        assessment: RiskAssessment {
            iterations,
            success_probability,
            duration,
            cost,
            risk_level,
            risk_factors,
        },
        durations,
        costs,
        duration_multiplier_p85,
    })
}

fn classify_risk(
    projects: &[RiskProject],
    success_probability: f64,
    duration: &DistributionSummary,
    cost: &DistributionSummary,
) -> (RiskLevel, Vec<String>) {
    let mut factors = Vec::new();
    for project in projects.iter().filter(|project| project.probability < 0.5) {
        factors.push(format!(
            "project {} is unlikely to proceed ({:.0}%)",
            project.id,
            project.probability * 100.0
        ));
    }
    let duration_cv = duration.coefficient_of_variation();
    let cost_cv = cost.coefficient_of_variation();
    if duration_cv > 0.1 {
        factors.push(format!("high schedule variability (cv {duration_cv:.2})"));
    }
    if cost_cv > 0.1 {
        factors.push(format!("high cost variability (cv {cost_cv:.2})"));
    }

    let level = if success_probability < 0.5 || duration_cv > 0.25 {
        RiskLevel::High
    } else if success_probability < 0.8 || duration_cv > 0.1 || cost_cv > 0.1 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };
    (level, factors)
}
