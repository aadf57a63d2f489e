//! Parameter-vector encoding and the genetic operators the optimizer runs on it.

use rand::Rng;

use crate::domain::parameter::{ParameterKind, ParameterValue, ScenarioParameter};
use crate::domain::scenario::Scenario;

/// How one tunable parameter may vary.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneSpec {
    Numeric { min: f64, max: f64 },
    Flag,
    Choice { options: Vec<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TunableParameter {
    pub parameter_id: String,
    pub spec: GeneSpec,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gene {
    Numeric(f64),
    Flag(bool),
    Choice(usize),
}

pub type Genome = Vec<Gene>;

/// The scenario parameters the optimizer is allowed to change, in declaration order.
///
/// A budget ceiling only moves the reported budget variance, never fitness,
/// so it is left out of the genome.
pub fn tunable_parameters(scenario: &Scenario) -> Vec<TunableParameter> {
    scenario
        .parameters
        .iter()
        .filter(|parameter| parameter.is_tunable())
        .filter(|parameter| parameter.kind != ParameterKind::BudgetCeiling)
        .filter_map(|parameter| {
            let spec = match &parameter.value {
                ParameterValue::Number(_) | ParameterValue::Percentage(_) => {
                    let (min, max) = parameter.numeric_range()?;
                    GeneSpec::Numeric { min, max }
                }
                ParameterValue::Boolean(_) => GeneSpec::Flag,
                ParameterValue::Enumeration(_) => GeneSpec::Choice {
                    options: parameter.allowed_values.clone()?,
                },
                ParameterValue::Date(_) => return None,
            };
            Some(TunableParameter {
                parameter_id: parameter.id.clone(),
                spec,
            })
        })
        .collect()
}

/// The scenario's current parameter values as a genome.
pub fn encode(scenario: &Scenario, tunables: &[TunableParameter]) -> Genome {
    tunables
        .iter()
        .map(|tunable| {
            let value = scenario
                .parameter(&tunable.parameter_id)
                .map(|parameter| &parameter.value);
            match (&tunable.spec, value) {
                (GeneSpec::Numeric { min, max }, Some(value)) => {
                    Gene::Numeric(value.as_f64().unwrap_or(*min).clamp(*min, *max))
                }
                (GeneSpec::Numeric { min, .. }, None) => Gene::Numeric(*min),
                (GeneSpec::Flag, value) => {
                    Gene::Flag(value.and_then(ParameterValue::as_bool).unwrap_or(false))
                }
                (GeneSpec::Choice { options }, Some(ParameterValue::Enumeration(current))) => {
                    Gene::Choice(options.iter().position(|o| o == current).unwrap_or(0))
                }
                (GeneSpec::Choice { .. }, _) => Gene::Choice(0),
            }
        })
        .collect()
}

/// A copy of `scenario` with the genome's values written into its parameters.
pub fn decode(scenario: &Scenario, tunables: &[TunableParameter], genome: &[Gene]) -> Scenario {
    let mut decoded = scenario.clone();
    for (tunable, gene) in tunables.iter().zip(genome) {
        let Some(parameter) = decoded.parameter_mut(&tunable.parameter_id) else {
            continue;
        };
        apply_gene(parameter, &tunable.spec, *gene);
    }
    decoded
}

fn apply_gene(parameter: &mut ScenarioParameter, spec: &GeneSpec, gene: Gene) {
    parameter.value = match (spec, gene) {
        (GeneSpec::Numeric { .. }, Gene::Numeric(value)) => parameter.value.with_numeric(value),
        (GeneSpec::Flag, Gene::Flag(value)) => ParameterValue::Boolean(value),
        (GeneSpec::Choice { options }, Gene::Choice(index)) => match options.get(index) {
            Some(option) => ParameterValue::Enumeration(option.clone()),
            None => return,
        },
        _ => return,
    };
}

/// Index of the fittest of `size` individuals drawn with replacement.
/// `fitness` must not be empty.
pub fn tournament_select<R: Rng + ?Sized>(fitness: &[f64], size: usize, rng: &mut R) -> usize {
    let mut best = rng.gen_range(0..fitness.len());
    for _ in 1..size.max(1) {
        let candidate = rng.gen_range(0..fitness.len());
        if fitness[candidate] > fitness[best] {
            best = candidate;
        }
    }
    best
}

/// Swaps the tails of the two parents after a random cut point.
pub fn single_point_crossover<R: Rng + ?Sized>(
    first: &[Gene],
    second: &[Gene],
    rng: &mut R,
) -> (Genome, Genome) {
    let len = first.len().min(second.len());
    if len < 2 {
        return (first.to_vec(), second.to_vec());
    }
    let cut = rng.gen_range(1..len);
    let mut left = first[..cut].to_vec();
    left.extend_from_slice(&second[cut..]);
    let mut right = second[..cut].to_vec();
    right.extend_from_slice(&first[cut..]);
    (left, right)
}

/// Mutates each gene with probability `rate`. Numeric genes move by at most
/// `magnitude` of their range and stay inside it; flags flip; choices move
/// to another option.
pub fn mutate<R: Rng + ?Sized>(
    genome: &mut [Gene],
    tunables: &[TunableParameter],
    rate: f64,
    magnitude: f64,
    rng: &mut R,
) {
    for (gene, tunable) in genome.iter_mut().zip(tunables) {
        if !rng.gen_bool(rate.clamp(0.0, 1.0)) {
            continue;
        }
        *gene = match (*gene, &tunable.spec) {
            (Gene::Numeric(value), GeneSpec::Numeric { min, max }) => {
                let step = rng.gen_range(-1.0..=1.0) * magnitude * (max - min);
                Gene::Numeric((value + step).clamp(*min, *max))
            }
            (Gene::Flag(value), GeneSpec::Flag) => Gene::Flag(!value),
            (Gene::Choice(index), GeneSpec::Choice { options }) if options.len() > 1 => {
                let shift = rng.gen_range(1..options.len());
                Gene::Choice((index + shift) % options.len())
            }
            (unchanged, _) => unchanged,
        };
    }
}
