//! The operations the planning engine exposes over a scenario store.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::allocation::{AllocationType, ScenarioAllocation};
use crate::domain::parameter::{ParameterError, ScenarioParameter};
use crate::domain::scenario::{
    Scenario, ScenarioConstraint, ScenarioProject, ScenarioStatus, ScenarioType,
};
use crate::domain::time_window::{TimeWindow, TimeWindowError};
use crate::services::comparison::{ScenarioComparison, StoredComparison, compare};
use crate::services::conflict_detector::{
    AllocationConflict, CapacityRequest, ConflictError, EmployeeConflictSummary,
    OverallocationPeriod, conflicted_employees, find_conflicts, group_by_employee,
    overallocated_periods, validate_capacity,
};
use crate::services::demand_aggregator::aggregate;
use crate::services::demand_templates::demand_profile;
use crate::services::engine_config_yaml::EngineConfig;
use crate::services::evaluation_types::{ScenarioEvaluation, SkillGap};
use crate::services::repository::{
    AllocationFilter, AllocationSource, RepositoryError, ScenarioAllocationFilter,
    ScenarioRepository,
};
use crate::services::scenario_evaluator::{
    DEFAULT_HORIZON_DAYS, EvaluationError, EvaluationInput, apply_parameters,
    evaluate_scenario_seeded, resolve_seed, skill_gaps,
};
use crate::services::scenario_optimizer::{
    OptimizationError, OptimizationObjectives, OptimizationResult, OptimizationSettings, optimize,
};
use crate::services::sensitivity_analysis::{
    DEFAULT_VARIATIONS, SensitivityError, SensitivityMetric, SensitivityReport,
    run_sensitivity_analysis,
};
use crate::services::timeline_analysis::{TimelineError, validate_dependencies};
use crate::services::ttl_cache::{Clock, SystemClock, TtlCache};

#[derive(Error, Debug)]
pub enum PlanningError {
    #[error("scenario not found: {0}")]
    ScenarioNotFound(String),
    #[error("scenario allocation not found: {0}")]
    AllocationNotFound(String),
    #[error("invalid allocation: {0}")]
    InvalidAllocation(String),
    #[error(transparent)]
    Window(#[from] TimeWindowError),
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    #[error(transparent)]
    Timeline(#[from] TimelineError),
    #[error(transparent)]
    Capacity(#[from] ConflictError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Sensitivity(#[from] SensitivityError),
    #[error(transparent)]
    Optimization(#[from] OptimizationError),
}

impl From<RepositoryError> for PlanningError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::ScenarioNotFound(id) => PlanningError::ScenarioNotFound(id),
            RepositoryError::AllocationNotFound(id) => PlanningError::AllocationNotFound(id),
        }
    }
}

/// Fields of a scenario chosen by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct NewScenario {
    pub name: String,
    pub description: String,
    pub scenario_type: ScenarioType,
    pub base_date: NaiveDate,
    pub forecast_horizon_months: u32,
    pub parameters: Vec<ScenarioParameter>,
    pub constraints: Vec<ScenarioConstraint>,
    pub projects: Vec<ScenarioProject>,
}

/// A partial update; `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ScenarioStatus>,
    pub base_date: Option<NaiveDate>,
    pub forecast_horizon_months: Option<u32>,
    pub parameters: Option<Vec<ScenarioParameter>>,
    pub constraints: Option<Vec<ScenarioConstraint>>,
    pub projects: Option<Vec<ScenarioProject>>,
}

/// Caller-supplied fields of a scenario allocation, used for creates and
/// full replacements.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationDraft {
    pub project_id: String,
    pub employee_id: String,
    pub role_id: Option<String>,
    pub allocation_type: AllocationType,
    pub allocation_percentage: f64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub estimated_hours: Option<f64>,
    pub hourly_rate: Option<f64>,
    pub confidence_level: f64,
}

impl AllocationDraft {
    pub fn new(employee_id: &str, project_id: &str, percentage: f64, start_date: NaiveDate) -> Self {
        Self {
            project_id: project_id.to_string(),
            employee_id: employee_id.to_string(),
            role_id: None,
            allocation_type: AllocationType::default(),
            allocation_percentage: percentage,
            start_date,
            end_date: None,
            estimated_hours: None,
            hourly_rate: None,
            confidence_level: 1.0,
        }
    }

    pub fn until(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    fn window(&self) -> Result<TimeWindow, PlanningError> {
        Ok(TimeWindow::new(self.start_date, self.end_date)?)
    }

    fn into_allocation(self, id: String, scenario_id: String) -> ScenarioAllocation {
        ScenarioAllocation {
            id,
            scenario_id,
            project_id: self.project_id,
            employee_id: self.employee_id,
            role_id: self.role_id,
            allocation_type: self.allocation_type,
            allocation_percentage: self.allocation_percentage,
            start_date: self.start_date,
            end_date: self.end_date,
            estimated_hours: self.estimated_hours,
            hourly_rate: self.hourly_rate,
            confidence_level: self.confidence_level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictReport {
    pub scenario_id: String,
    pub conflicts: Vec<AllocationConflict>,
    pub by_employee: Vec<EmployeeConflictSummary>,
    pub overallocated_periods: Vec<OverallocationPeriod>,
    pub employees: BTreeSet<String>,
}

impl ConflictReport {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty() && self.overallocated_periods.is_empty()
    }
}

/// A request to search for better parameter settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptimizationRequest {
    pub objectives: OptimizationObjectives,
    /// Evaluated alongside the scenario's own constraints.
    pub constraints: Vec<ScenarioConstraint>,
    pub generations: Option<usize>,
    pub population_size: Option<usize>,
    pub deadline: Option<std::time::Instant>,
}

/// Scenario ids and last-update stamps; an edit to either side misses.
type ComparisonKey = (String, DateTime<Utc>, String, DateTime<Utc>);

pub struct PlanningService<R, C = SystemClock> {
    repository: R,
    config: EngineConfig,
    clock: C,
    seed: u64,
    comparisons: TtlCache<ComparisonKey, ScenarioComparison>,
    /// Serializes the capacity check with the write it guards.
    capacity_guard: Mutex<()>,
}

impl<R> PlanningService<R, SystemClock>
where
    R: ScenarioRepository + AllocationSource,
{
    pub fn new(repository: R, config: EngineConfig) -> Self {
        Self::with_clock(repository, config, SystemClock)
    }
}

impl<R, C> PlanningService<R, C>
where
    R: ScenarioRepository + AllocationSource,
    C: Clock,
{
    /// Comparisons the repository kept from earlier runs are loaded into the
    /// cache and expire `comparison_ttl_hours` after they were computed.
    pub fn with_clock(repository: R, config: EngineConfig, clock: C) -> Self {
        let ttl = Duration::hours(config.comparison_ttl_hours);
        let seed = resolve_seed(config.seed);
        let comparisons = TtlCache::new(ttl);
        let stored = repository.list_comparisons().unwrap_or_else(|error| {
            warn!(%error, "stored comparisons could not be read");
            Vec::new()
        });
        for stored in stored {
            let key = (
                stored.comparison.scenario_a.clone(),
                stored.scenario_a_updated_at,
                stored.comparison.scenario_b.clone(),
                stored.scenario_b_updated_at,
            );
            let computed_at = stored.comparison.computed_at;
            comparisons.insert(key, stored.comparison, computed_at);
        }
        Self {
            repository,
            config,
            clock,
            seed,
            comparisons,
            capacity_guard: Mutex::new(()),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Seed shared by every evaluation this service runs.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn create_scenario(&self, new: NewScenario) -> Result<Scenario, PlanningError> {
        let now = self.clock.now();
        let scenario = Scenario {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            description: new.description,
            scenario_type: new.scenario_type,
            status: ScenarioStatus::Draft,
            base_date: new.base_date,
            forecast_horizon_months: new.forecast_horizon_months,
            parameters: new.parameters,
            constraints: new.constraints,
            projects: new.projects,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        check_scenario(&scenario)?;
        self.repository.save_scenario(scenario.clone())?;
        info!(scenario = %scenario.id, name = %scenario.name, "scenario created");
        Ok(scenario)
    }

    pub fn update_scenario(&self, id: &str, update: ScenarioUpdate) -> Result<Scenario, PlanningError> {
        let mut scenario = self.live_scenario(id)?;
        if let Some(name) = update.name {
            scenario.name = name;
        }
        if let Some(description) = update.description {
            scenario.description = description;
        }
        if let Some(status) = update.status {
            scenario.status = status;
        }
        if let Some(base_date) = update.base_date {
            scenario.base_date = base_date;
        }
        if let Some(months) = update.forecast_horizon_months {
            scenario.forecast_horizon_months = months;
        }
        if let Some(parameters) = update.parameters {
            scenario.parameters = parameters;
        }
        if let Some(constraints) = update.constraints {
            scenario.constraints = constraints;
        }
        if let Some(projects) = update.projects {
            scenario.projects = projects;
        }
        check_scenario(&scenario)?;
        scenario.updated_at = self.clock.now();
        self.repository.save_scenario(scenario.clone())?;
        debug!(scenario = %scenario.id, "scenario updated");
        Ok(scenario)
    }

    /// Soft delete: the scenario is archived and stops resolving.
    pub fn delete_scenario(&self, id: &str) -> Result<(), PlanningError> {
        let mut scenario = self.live_scenario(id)?;
        let now = self.clock.now();
        scenario.deleted_at = Some(now);
        scenario.status = ScenarioStatus::Archived;
        scenario.updated_at = now;
        self.repository.save_scenario(scenario)?;
        info!(scenario = id, "scenario deleted");
        Ok(())
    }

    /// Copies the scenario and its allocations under fresh ids. The copy
    /// starts as a draft.
    pub fn duplicate_scenario(&self, id: &str, new_name: &str) -> Result<Scenario, PlanningError> {
        let source = self.live_scenario(id)?;
        let allocations = self
            .repository
            .list_scenario_allocations(id, &ScenarioAllocationFilter::default())?;

        let now = self.clock.now();
        let copy = Scenario {
            id: Uuid::new_v4().to_string(),
            name: new_name.to_string(),
            status: ScenarioStatus::Draft,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            ..source
        };
        self.repository.save_scenario(copy.clone())?;
        for allocation in allocations {
            self.repository.save_scenario_allocation(ScenarioAllocation {
                id: Uuid::new_v4().to_string(),
                scenario_id: copy.id.clone(),
                ..allocation
            })?;
        }
        info!(source = id, copy = %copy.id, "scenario duplicated");
        Ok(copy)
    }

    pub fn list_scenario_allocations(
        &self,
        scenario_id: &str,
        filter: &ScenarioAllocationFilter,
    ) -> Result<Vec<ScenarioAllocation>, PlanningError> {
        self.live_scenario(scenario_id)?;
        Ok(self.repository.list_scenario_allocations(scenario_id, filter)?)
    }

    /// Adds an allocation unless it would push the employee past 100% in
    /// this scenario.
    pub fn create_scenario_allocation(
        &self,
        scenario_id: &str,
        draft: AllocationDraft,
    ) -> Result<ScenarioAllocation, PlanningError> {
        let _guard = self
            .capacity_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let scenario = self.live_scenario(scenario_id)?;
        self.guard_capacity(&scenario.id, &draft, None)?;

        let allocation = draft.into_allocation(Uuid::new_v4().to_string(), scenario.id.clone());
        self.repository.save_scenario_allocation(allocation.clone())?;
        self.touch(scenario)?;
        debug!(allocation = %allocation.id, scenario = scenario_id, "scenario allocation created");
        Ok(allocation)
    }

    /// Replaces an allocation. Its current percentage is left out of the
    /// capacity check.
    pub fn update_scenario_allocation(
        &self,
        id: &str,
        draft: AllocationDraft,
    ) -> Result<ScenarioAllocation, PlanningError> {
        let _guard = self
            .capacity_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let existing = self.repository.get_scenario_allocation(id)?;
        let scenario = self.live_scenario(&existing.scenario_id)?;
        self.guard_capacity(&scenario.id, &draft, Some(id))?;

        let allocation = draft.into_allocation(existing.id, existing.scenario_id);
        self.repository.save_scenario_allocation(allocation.clone())?;
        self.touch(scenario)?;
        debug!(allocation = id, "scenario allocation updated");
        Ok(allocation)
    }

    pub fn delete_scenario_allocation(&self, id: &str) -> Result<(), PlanningError> {
        let _guard = self
            .capacity_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let existing = self.repository.get_scenario_allocation(id)?;
        self.repository.delete_scenario_allocation(id)?;
        if let Ok(scenario) = self.live_scenario(&existing.scenario_id) {
            self.touch(scenario)?;
        }
        debug!(allocation = id, "scenario allocation deleted");
        Ok(())
    }

    pub fn evaluate_scenario(
        &self,
        id: &str,
        horizon_days: Option<usize>,
    ) -> Result<ScenarioEvaluation, PlanningError> {
        let scenario = self.live_scenario(id)?;
        let allocations = self
            .repository
            .list_scenario_allocations(id, &ScenarioAllocationFilter::default())?;
        let committed = self.repository.list_allocations(&AllocationFilter::default())?;
        let input = EvaluationInput {
            scenario: &scenario,
            allocations: &allocations,
            committed: &committed,
            horizon_days: horizon_days.unwrap_or(DEFAULT_HORIZON_DAYS),
        };
        Ok(evaluate_scenario_seeded(&input, &self.config, self.seed)?)
    }

    /// Compares two scenarios over the default horizon. Results are cached
    /// until the TTL passes or either scenario changes.
    pub fn compare_scenarios(&self, id_a: &str, id_b: &str) -> Result<ScenarioComparison, PlanningError> {
        let scenario_a = self.live_scenario(id_a)?;
        let scenario_b = self.live_scenario(id_b)?;
        let key = (
            scenario_a.id.clone(),
            scenario_a.updated_at,
            scenario_b.id.clone(),
            scenario_b.updated_at,
        );
        let now = self.clock.now();
        if let Some(cached) = self.comparisons.get(&key, now) {
            debug!(scenario_a = id_a, scenario_b = id_b, "comparison cache hit");
            return Ok(cached);
        }
        debug!(scenario_a = id_a, scenario_b = id_b, "comparison cache miss");

        let result_a = self.evaluate_scenario(id_a, None)?.result;
        let result_b = self.evaluate_scenario(id_b, None)?.result;
        let comparison = compare(&result_a, &result_b, now);
        self.comparisons.purge_expired(now);
        self.comparisons.insert(key, comparison.clone(), now);
        self.store_comparisons(now)?;
        Ok(comparison)
    }

    /// Hands the live cache to the repository so later runs can reuse it.
    fn store_comparisons(&self, now: DateTime<Utc>) -> Result<(), PlanningError> {
        let mut stored: Vec<StoredComparison> = self
            .comparisons
            .live_entries(now)
            .into_iter()
            .map(|((_, updated_a, _, updated_b), comparison)| StoredComparison {
                scenario_a_updated_at: updated_a,
                scenario_b_updated_at: updated_b,
                comparison,
            })
            .collect();
        stored.sort_by(|left, right| {
            left.comparison
                .computed_at
                .cmp(&right.comparison.computed_at)
                .then_with(|| left.comparison.scenario_a.cmp(&right.comparison.scenario_a))
                .then_with(|| left.comparison.scenario_b.cmp(&right.comparison.scenario_b))
        });
        self.repository.replace_comparisons(stored)?;
        Ok(())
    }

    /// Pairwise conflicts plus the day sweep over the scenario's horizon.
    pub fn detect_resource_conflicts(&self, scenario_id: &str) -> Result<ConflictReport, PlanningError> {
        let scenario = self.live_scenario(scenario_id)?;
        let allocations = self
            .repository
            .list_scenario_allocations(scenario_id, &ScenarioAllocationFilter::default())?;
        let conflicts = find_conflicts(&allocations);
        let horizon = TimeWindow::from_horizon(scenario.base_date, scenario.horizon_days());
        let periods = overallocated_periods(&allocations, &horizon);

        let mut employees = conflicted_employees(&conflicts);
        employees.extend(periods.iter().map(|period| period.employee_id.clone()));
        if !employees.is_empty() {
            warn!(
                scenario = scenario_id,
                employees = employees.len(),
                "over-allocated employees found"
            );
        }
        Ok(ConflictReport {
            scenario_id: scenario.id,
            by_employee: group_by_employee(&conflicts),
            conflicts,
            overallocated_periods: periods,
            employees,
        })
    }

    /// Skill demand against configured capacity over the default horizon,
    /// without running the full evaluation.
    pub fn analyze_skill_gaps(&self, scenario_id: &str) -> Result<Vec<SkillGap>, PlanningError> {
        let scenario = self.live_scenario(scenario_id)?;
        for parameter in &scenario.parameters {
            parameter.validate()?;
        }
        let profiles: Vec<_> = apply_parameters(&scenario, self.config.inclusion_threshold)
            .iter()
            .filter(|project| project.included)
            .map(|project| demand_profile(&project.project))
            .collect();
        let curve = aggregate(&profiles, scenario.base_date, DEFAULT_HORIZON_DAYS);
        Ok(skill_gaps(&curve, &self.config))
    }

    /// Every numeric parameter is varied when `parameter_ids` is empty, and
    /// the default variations are used when `variations` is.
    pub fn run_sensitivity_analysis(
        &self,
        scenario_id: &str,
        parameter_ids: &[String],
        variations: &[f64],
        metric: SensitivityMetric,
        horizon_days: Option<usize>,
    ) -> Result<SensitivityReport, PlanningError> {
        let scenario = self.live_scenario(scenario_id)?;
        let allocations = self
            .repository
            .list_scenario_allocations(scenario_id, &ScenarioAllocationFilter::default())?;
        let committed = self.repository.list_allocations(&AllocationFilter::default())?;
        let parameter_ids: Vec<String> = if parameter_ids.is_empty() {
            scenario
                .parameters
                .iter()
                .filter(|parameter| parameter.value.as_f64().is_some())
                .map(|parameter| parameter.id.clone())
                .collect()
        } else {
            parameter_ids.to_vec()
        };
        let variations = if variations.is_empty() {
            &DEFAULT_VARIATIONS[..]
        } else {
            variations
        };
        let input = EvaluationInput {
            scenario: &scenario,
            allocations: &allocations,
            committed: &committed,
            horizon_days: horizon_days.unwrap_or(DEFAULT_HORIZON_DAYS),
        };
        Ok(run_sensitivity_analysis(
            &input,
            &self.config,
            &parameter_ids,
            variations,
            metric,
            self.seed,
        )?)
    }

    /// Searches parameter settings for the scenario. The stored scenario is
    /// left untouched; the caller decides whether to keep the result.
    pub fn optimize_scenario(
        &self,
        scenario_id: &str,
        request: OptimizationRequest,
    ) -> Result<OptimizationResult, PlanningError> {
        let mut scenario = self.live_scenario(scenario_id)?;
        scenario.constraints.extend(request.constraints);
        let allocations = self
            .repository
            .list_scenario_allocations(scenario_id, &ScenarioAllocationFilter::default())?;
        let committed = self.repository.list_allocations(&AllocationFilter::default())?;
        let input = EvaluationInput {
            scenario: &scenario,
            allocations: &allocations,
            committed: &committed,
            horizon_days: DEFAULT_HORIZON_DAYS,
        };
        let defaults = OptimizationSettings::default();
        let settings = OptimizationSettings {
            generations: request.generations.unwrap_or(defaults.generations),
            population_size: request.population_size.unwrap_or(defaults.population_size),
            deadline: request.deadline,
            seed: self.seed,
            objectives: request.objectives,
            ..defaults
        };
        Ok(optimize(&input, &self.config, &settings)?)
    }

    /// The scenario, unless it is missing or soft-deleted.
    fn live_scenario(&self, id: &str) -> Result<Scenario, PlanningError> {
        let scenario = self.repository.get_scenario(id)?;
        if scenario.is_deleted() {
            return Err(PlanningError::ScenarioNotFound(id.to_string()));
        }
        Ok(scenario)
    }

    fn guard_capacity(
        &self,
        scenario_id: &str,
        draft: &AllocationDraft,
        exclude_id: Option<&str>,
    ) -> Result<(), PlanningError> {
        if !(0.0..=1.0).contains(&draft.confidence_level) {
            return Err(PlanningError::InvalidAllocation(format!(
                "confidence level {} is outside 0-1",
                draft.confidence_level
            )));
        }
        let window = draft.window()?;
        let existing = self.repository.list_scenario_allocations(
            scenario_id,
            &ScenarioAllocationFilter {
                employee_id: Some(draft.employee_id.clone()),
                project_id: None,
            },
        )?;
        let request = CapacityRequest {
            employee_id: &draft.employee_id,
            scenario_id,
            window,
            percentage: draft.allocation_percentage,
            exclude_id,
        };
        validate_capacity(&existing, &request).map_err(|error| {
            warn!(
                employee = %draft.employee_id,
                scenario = scenario_id,
                %error,
                "allocation rejected by capacity guard"
            );
            PlanningError::from(error)
        })
    }

    /// Bumps `updated_at` so cached comparisons of the scenario go stale.
    fn touch(&self, mut scenario: Scenario) -> Result<(), PlanningError> {
        scenario.updated_at = self.clock.now().max(scenario.updated_at + Duration::microseconds(1));
        self.repository.save_scenario(scenario)?;
        Ok(())
    }
}

fn check_scenario(scenario: &Scenario) -> Result<(), PlanningError> {
    for parameter in &scenario.parameters {
        parameter.validate()?;
    }
    validate_dependencies(&scenario.projects)?;
    Ok(())
}
