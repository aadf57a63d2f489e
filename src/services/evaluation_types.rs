use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::demand::{PeakDemand, SkillBottleneck};
use crate::domain::forecast::TrendDirection;
use crate::services::conflict_detector::AllocationConflict;
use crate::services::risk_simulation::RiskAssessment;
use crate::services::timeline_analysis::TimelineAnalysis;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum UtilizationSeverity {
    Low,
    Medium,
    High,
}

impl UtilizationSeverity {
    /// `None` at or below 90% utilization.
    pub fn classify(utilization: f64) -> Option<Self> {
        if utilization > 1.2 {
            Some(UtilizationSeverity::High)
        } else if utilization > 1.0 {
            Some(UtilizationSeverity::Medium)
        } else if utilization > 0.9 {
            Some(UtilizationSeverity::Low)
        } else {
            None
        }
    }
}

/// Consecutive days above 90% overall utilization.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UtilizationPeak {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub peak_utilization: f64,
    pub severity: UtilizationSeverity,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SkillUtilization {
    pub skill: String,
    pub capacity: f64,
    pub mean_utilization: f64,
    pub peak_utilization: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OverallocatedSkill {
    pub skill: String,
    pub days_over_capacity: usize,
    /// Mean of `utilization - 1` over the days above capacity.
    pub mean_excess: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UtilizationMetrics {
    pub total_capacity: f64,
    pub average_utilization: f64,
    pub peak_utilization: f64,
    pub peaks: Vec<UtilizationPeak>,
    pub skills: Vec<SkillUtilization>,
    pub underutilized_skills: Vec<String>,
    pub overallocated_skills: Vec<OverallocatedSkill>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Warning,
    Error,
}

/// A policy breach found during evaluation. Evaluation still completes.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ConstraintViolation {
    pub constraint_type: String,
    pub severity: ViolationSeverity,
    pub description: String,
    pub suggested_actions: Vec<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CostAnalysis {
    pub daily_rate: f64,
    pub demand_cost: f64,
    pub allocation_cost: f64,
    pub total_projected_cost: f64,
    pub average_daily_cost: f64,
    pub peak_daily_cost: f64,
    pub by_project: BTreeMap<String, f64>,
    pub budget: Option<f64>,
    /// Budget minus projected cost; negative when over budget.
    pub budget_variance: Option<f64>,
    pub budget_variance_percent: Option<f64>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DemandSummary {
    pub total_fte_days: f64,
    pub average_daily_demand: f64,
    pub peak: Option<PeakDemand>,
    pub bottlenecks: Vec<SkillBottleneck>,
}

/// Forecast of load already committed outside the scenario.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CapacityForecastSummary {
    pub trend: TrendDirection,
    pub confidence: f64,
    pub has_seasonality: bool,
    pub average_committed_load: f64,
    pub peak_committed_load: f64,
    pub sample_count: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SkillGap {
    pub skill: String,
    pub capacity: f64,
    pub average_demand: f64,
    pub peak_demand: f64,
    /// Peak demand minus capacity; positive means short.
    pub gap: f64,
    pub severity: Option<UtilizationSeverity>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ScenarioResult {
    pub scenario_id: String,
    pub scenario_name: String,
    pub base_date: NaiveDate,
    pub horizon_days: usize,
    pub included_projects: Vec<String>,
    pub excluded_projects: Vec<String>,
    pub utilization: UtilizationMetrics,
    pub demand: DemandSummary,
    pub capacity_forecast: Option<CapacityForecastSummary>,
    pub violations: Vec<ConstraintViolation>,
    pub risk: RiskAssessment,
    pub cost: CostAnalysis,
    pub timeline: TimelineAnalysis,
    pub conflicts: Vec<AllocationConflict>,
    pub skill_gaps: Vec<SkillGap>,
}

impl ScenarioResult {
    pub fn error_count(&self) -> usize {
        self.violations
            .iter()
            .filter(|violation| violation.severity == ViolationSeverity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.violations
            .iter()
            .filter(|violation| violation.severity == ViolationSeverity::Warning)
            .count()
    }
}

/// Result plus the raw simulated durations, for plotting.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioEvaluation {
    pub result: ScenarioResult,
    pub duration_samples: Vec<f64>,
}
