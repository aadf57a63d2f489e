use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::scenario::Scenario;
use crate::services::engine_config_yaml::EngineConfig;
use crate::services::evaluation_types::ScenarioResult;
use crate::services::genetic_operators::{
    Genome, TunableParameter, decode, encode, mutate, single_point_crossover, tournament_select,
    tunable_parameters,
};
use crate::services::scenario_evaluator::{
    EvaluationError, EvaluationInput, evaluate_scenario_seeded,
};
use crate::services::statistics::variance;

pub const ERROR_PENALTY: f64 = 500.0;
pub const WARNING_PENALTY: f64 = 100.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizationError {
    #[error("invalid optimization settings: {0}")]
    InvalidSettings(String),
    #[error("baseline evaluation failed: {0}")]
    Baseline(#[from] EvaluationError),
    #[error("no individual of the first generation could be evaluated")]
    NoViableIndividuals,
}

/// Relative weights of the fitness terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationObjectives {
    pub cost_weight: f64,
    pub timeline_weight: f64,
    pub risk_weight: f64,
}

impl Default for OptimizationObjectives {
    fn default() -> Self {
        Self {
            cost_weight: 0.4,
            timeline_weight: 0.3,
            risk_weight: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationSettings {
    pub generations: usize,
    pub population_size: usize,
    pub elite_fraction: f64,
    pub tournament_size: usize,
    pub mutation_rate: f64,
    /// Largest mutation step as a share of the parameter's range.
    pub mutation_magnitude: f64,
    pub convergence_window: usize,
    pub convergence_threshold: f64,
    pub deadline: Option<Instant>,
    pub seed: u64,
    pub objectives: OptimizationObjectives,
}

impl Default for OptimizationSettings {
    fn default() -> Self {
        Self {
            generations: 50,
            population_size: 20,
            elite_fraction: 0.2,
            tournament_size: 3,
            mutation_rate: 0.1,
            mutation_magnitude: 0.1,
            convergence_window: 10,
            convergence_threshold: 1e-3,
            deadline: None,
            seed: 0,
            objectives: OptimizationObjectives::default(),
        }
    }
}

impl OptimizationSettings {
    pub fn validate(&self) -> Result<(), OptimizationError> {
        let invalid = |message: &str| -> Result<(), OptimizationError> {
            Err(OptimizationError::InvalidSettings(message.to_string()))
        };
        if self.generations == 0 {
            return invalid("generations must be greater than zero");
        }
        if self.population_size < 2 {
            return invalid("population_size must be at least 2");
        }
        if !(0.0..=1.0).contains(&self.elite_fraction) {
            return invalid("elite_fraction must be within 0-1");
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return invalid("mutation_rate must be within 0-1");
        }
        if !(0.0..=1.0).contains(&self.mutation_magnitude) {
            return invalid("mutation_magnitude must be within 0-1");
        }
        if self.tournament_size == 0 || self.convergence_window < 2 {
            return invalid("tournament_size must be positive and convergence_window at least 2");
        }
        let weights = self.objectives;
        if weights.cost_weight < 0.0 || weights.timeline_weight < 0.0 || weights.risk_weight < 0.0 {
            return invalid("objective weights must not be negative");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Converged,
    GenerationLimit,
    Deadline,
    NothingToTune,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationResult {
    pub optimized: Scenario,
    pub best_result: ScenarioResult,
    pub best_fitness: f64,
    /// Best fitness of generation 0.
    pub initial_fitness: f64,
    /// Best-so-far fitness after each generation.
    pub fitness_trace: Vec<f64>,
    pub termination: TerminationReason,
    pub failed_evaluations: usize,
}

/// Weighted inverse cost, inverse average delay and success probability,
/// less a penalty per constraint violation.
pub fn fitness(
    result: &ScenarioResult,
    baseline_cost: f64,
    objectives: &OptimizationObjectives,
) -> f64 {
    let cost = result.cost.total_projected_cost;
    let cost_ratio = if cost > 0.0 && baseline_cost > 0.0 {
        baseline_cost / cost
    } else {
        1.0
    };
    let delay = result.timeline.average_delay_days.max(0.0);
    objectives.cost_weight * 100.0 * cost_ratio
        + objectives.timeline_weight * 100.0 / (1.0 + delay)
        + objectives.risk_weight * 100.0 * result.risk.success_probability
        - ERROR_PENALTY * result.error_count() as f64
        - WARNING_PENALTY * result.warning_count() as f64
}

#[derive(Debug, Clone)]
struct Scored {
    genome: Genome,
    fitness: f64,
    result: ScenarioResult,
}

/// Genetic search over the scenario's tunable parameters.
///
/// A heuristic: the returned scenario is the best one seen, never worse than
/// the best of generation 0, with no claim of optimality. Every candidate is
/// evaluated with the same seed, so fitness differences come from the
/// parameters alone.
pub fn optimize(
    input: &EvaluationInput<'_>,
    config: &EngineConfig,
    settings: &OptimizationSettings,
) -> Result<OptimizationResult, OptimizationError> {
    settings.validate()?;
    let baseline = evaluate_scenario_seeded(input, config, settings.seed)?.result;
    let baseline_cost = baseline.cost.total_projected_cost;
    let tunables = tunable_parameters(input.scenario);

    if tunables.is_empty() {
        info!(scenario = %input.scenario.id, "no tunable parameters, returning the scenario as is");
        let score = fitness(&baseline, baseline_cost, &settings.objectives);
        return Ok(OptimizationResult {
            optimized: input.scenario.clone(),
            best_result: baseline,
            best_fitness: score,
            initial_fitness: score,
            fitness_trace: vec![score],
            termination: TerminationReason::NothingToTune,
            failed_evaluations: 0,
        });
    }

    let mut rng = StdRng::seed_from_u64(settings.seed);
    let baseline_genome = encode(input.scenario, &tunables);
    let mut population: Vec<Genome> = (0..settings.population_size)
        .map(|index| {
            let mut genome = baseline_genome.clone();
            if index > 0 {
                mutate(&mut genome, &tunables, 1.0, settings.mutation_magnitude, &mut rng);
            }
            genome
        })
        .collect();

    let mut best: Option<Scored> = None;
    let mut initial_fitness = None;
    let mut fitness_trace = Vec::with_capacity(settings.generations);
    let mut failed_evaluations = 0;
    let mut termination = TerminationReason::GenerationLimit;

    for generation in 0..settings.generations {
        if generation > 0 && settings.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            termination = TerminationReason::Deadline;
            break;
        }

        let (mut scored, failures) =
            score_population(&population, &tunables, input, config, settings, baseline_cost);
        failed_evaluations += failures;
        scored.sort_by(|a, b| b.fitness.partial_cmp(&a.fitness).unwrap_or(std::cmp::Ordering::Equal));

        if let Some(leader) = scored.first() {
            if best.as_ref().is_none_or(|best| leader.fitness > best.fitness) {
                best = Some(leader.clone());
            }
            initial_fitness.get_or_insert(leader.fitness);
        }
        let Some(best_so_far) = best.as_ref() else {
            return Err(OptimizationError::NoViableIndividuals);
        };
        fitness_trace.push(best_so_far.fitness);
        debug!(
            generation,
            best_fitness = best_so_far.fitness,
            evaluated = scored.len(),
            failures,
            "generation scored"
        );

        if converged(&fitness_trace, settings) {
            termination = TerminationReason::Converged;
            break;
        }
        if generation + 1 < settings.generations {
            if scored.is_empty() {
                scored.push(best_so_far.clone());
            }
            population = next_generation(&scored, &tunables, settings, &mut rng);
        }
    }

    let best = best.ok_or(OptimizationError::NoViableIndividuals)?;
    let initial_fitness = initial_fitness.unwrap_or(best.fitness);
    info!(
        scenario = %input.scenario.id,
        generations = fitness_trace.len(),
        initial_fitness,
        best_fitness = best.fitness,
        ?termination,
        "optimization finished"
    );
    Ok(OptimizationResult {
        optimized: decode(input.scenario, &tunables, &best.genome),
        best_result: best.result,
        best_fitness: best.fitness,
        initial_fitness,
        fitness_trace,
        termination,
        failed_evaluations,
    })
}

/// Evaluates a generation in parallel. Individuals whose evaluation fails
/// are logged and left out.
fn score_population(
    population: &[Genome],
    tunables: &[TunableParameter],
    input: &EvaluationInput<'_>,
    config: &EngineConfig,
    settings: &OptimizationSettings,
    baseline_cost: f64,
) -> (Vec<Scored>, usize) {
    let outcomes: Vec<Result<Scored, EvaluationError>> = population
        .par_iter()
        .map(|genome| -> Result<Scored, EvaluationError> {
            let candidate = decode(input.scenario, tunables, genome);
            let candidate_input = EvaluationInput {
                scenario: &candidate,
                ..*input
            };
            let result = evaluate_scenario_seeded(&candidate_input, config, settings.seed)?.result;
            Ok(Scored {
                genome: genome.clone(),
                fitness: fitness(&result, baseline_cost, &settings.objectives),
                result,
            })
        })
        .collect();

    let mut scored = Vec::with_capacity(outcomes.len());
    let mut failures = 0;
    for outcome in outcomes {
        match outcome {
            Ok(individual) => scored.push(individual),
            Err(error) => {
                warn!(%error, "excluding individual whose evaluation failed");
                failures += 1;
            }
        }
    }
    (scored, failures)
}

fn converged(trace: &[f64], settings: &OptimizationSettings) -> bool {
    let window = settings.convergence_window;
    trace.len() >= window && variance(&trace[trace.len() - window..]) < settings.convergence_threshold
}

/// Elites carry over unchanged; the rest are bred from tournament winners.
/// `ranked` is sorted best first and not empty.
fn next_generation(
    ranked: &[Scored],
    tunables: &[TunableParameter],
    settings: &OptimizationSettings,
    rng: &mut StdRng,
) -> Vec<Genome> {
    let elite_count = ((settings.population_size as f64 * settings.elite_fraction).round() as usize)
        .clamp(1, ranked.len());
    let mut next: Vec<Genome> = ranked[..elite_count]
        .iter()
        .map(|individual| individual.genome.clone())
        .collect();
    let fitness: Vec<f64> = ranked.iter().map(|individual| individual.fitness).collect();

    while next.len() < settings.population_size {
        let first = &ranked[tournament_select(&fitness, settings.tournament_size, rng)].genome;
        let second = &ranked[tournament_select(&fitness, settings.tournament_size, rng)].genome;
        let (mut left, mut right) = single_point_crossover(first, second, rng);
        mutate(&mut left, tunables, settings.mutation_rate, settings.mutation_magnitude, rng);
        mutate(&mut right, tunables, settings.mutation_rate, settings.mutation_magnitude, rng);
        next.push(left);
        if next.len() < settings.population_size {
            next.push(right);
        }
    }
    next
}
