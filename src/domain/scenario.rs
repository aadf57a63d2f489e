use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::demand::ProjectPhase;
use crate::domain::parameter::{ParameterKind, ScenarioParameter};
use crate::domain::time_window::{MAX_HORIZON_DAYS, TimeWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioType {
    Baseline,
    Growth,
    Contraction,
    Restructuring,
    WhatIf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    #[default]
    Draft,
    Active,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Software,
    Infrastructure,
    Research,
    Consulting,
    #[default]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// A hypothetical project the scenario plans for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioProject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub project_type: ProjectType,
    #[serde(default)]
    pub priority: ProjectPriority,
    /// Probability the project goes ahead, 0-1.
    #[serde(default = "default_probability")]
    pub probability: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub team_size: f64,
    #[serde(default)]
    pub required_skills: Vec<String>,
    /// Explicit phases; synthesized from the project type template when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phases: Vec<ProjectPhase>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

fn default_probability() -> f64 {
    1.0
}

impl ScenarioProject {
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_date,
            end: Some(self.end_date.max(self.start_date)),
        }
    }

    pub fn duration_days(&self) -> i64 {
        self.window().duration_days().unwrap_or(1)
    }

    pub fn is_critical(&self) -> bool {
        self.priority >= ProjectPriority::High
    }
}

/// A policy the evaluated scenario should respect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioConstraint {
    /// Utilization (demand / capacity) must stay at or below `max_utilization`,
    /// overall or for one skill.
    ResourceLimit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        skill: Option<String>,
        max_utilization: f64,
    },
    BudgetLimit { max_total_cost: f64 },
    /// Projects (or one project) must end by `deadline`.
    Timeline {
        deadline: NaiveDate,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        project_id: Option<String>,
    },
    /// At least `min_capacity` FTE of `skill` must be available and cover peak demand.
    SkillAvailability { skill: String, min_capacity: f64 },
}

impl ScenarioConstraint {
    pub fn type_name(&self) -> &'static str {
        match self {
            ScenarioConstraint::ResourceLimit { .. } => "resource_limit",
            ScenarioConstraint::BudgetLimit { .. } => "budget_limit",
            ScenarioConstraint::Timeline { .. } => "timeline",
            ScenarioConstraint::SkillAvailability { .. } => "skill_availability",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub scenario_type: ScenarioType,
    #[serde(default)]
    pub status: ScenarioStatus,
    pub base_date: NaiveDate,
    #[serde(default = "default_horizon_months")]
    pub forecast_horizon_months: u32,
    #[serde(default)]
    pub parameters: Vec<ScenarioParameter>,
    #[serde(default)]
    pub constraints: Vec<ScenarioConstraint>,
    #[serde(default)]
    pub projects: Vec<ScenarioProject>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

fn default_horizon_months() -> u32 {
    12
}

impl Scenario {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn parameter(&self, id: &str) -> Option<&ScenarioParameter> {
        self.parameters.iter().find(|parameter| parameter.id == id)
    }

    pub fn parameter_mut(&mut self, id: &str) -> Option<&mut ScenarioParameter> {
        self.parameters.iter_mut().find(|parameter| parameter.id == id)
    }

    pub fn project(&self, id: &str) -> Option<&ScenarioProject> {
        self.projects.iter().find(|project| project.id == id)
    }

    /// Budget used for cost variance: the budget-ceiling parameter wins over
    /// the tightest declared budget limit.
    pub fn declared_budget(&self) -> Option<f64> {
        let ceiling = self
            .parameters
            .iter()
            .filter(|parameter| parameter.kind == ParameterKind::BudgetCeiling)
            .find_map(|parameter| parameter.value.as_f64());
        ceiling.or_else(|| {
            self.constraints
                .iter()
                .filter_map(|constraint| match constraint {
                    ScenarioConstraint::BudgetLimit { max_total_cost } => Some(*max_total_cost),
                    _ => None,
                })
                .reduce(f64::min)
        })
    }

    /// Forecast horizon in days, roughly 30.4 days per month, capped at
    /// `MAX_HORIZON_DAYS`.
    pub fn horizon_days(&self) -> usize {
        let days = ((self.forecast_horizon_months.max(1) as f64) * 30.4).round() as usize;
        days.min(MAX_HORIZON_DAYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parameter::ParameterValue;
    use crate::test_support::{build_project, build_scenario, on_date};

    #[test]
    fn budget_ceiling_parameter_overrides_budget_limits() {
        let mut scenario = build_scenario("S1", vec![]);
        scenario.constraints = vec![
            ScenarioConstraint::BudgetLimit {
                max_total_cost: 500_000.0,
            },
            ScenarioConstraint::BudgetLimit {
                max_total_cost: 400_000.0,
            },
        ];
        assert_eq!(scenario.declared_budget(), Some(400_000.0));

        scenario.parameters.push(ScenarioParameter::new(
            "ceiling",
            ParameterKind::BudgetCeiling,
            ParameterValue::Number(450_000.0),
        ));
        assert_eq!(scenario.declared_budget(), Some(450_000.0));
    }

    #[test]
    fn constraints_deserialize_from_tagged_yaml() {
        let yaml = r#"
- type: resource_limit
  max_utilization: 0.9
- type: timeline
  deadline: 2026-12-31
  project_id: P1
- type: skill_availability
  skill: rust
  min_capacity: 2
"#;
        let constraints: Vec<ScenarioConstraint> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(constraints.len(), 3);
        assert_eq!(
            constraints[0],
            ScenarioConstraint::ResourceLimit {
                skill: None,
                max_utilization: 0.9
            }
        );
        assert_eq!(constraints[1].type_name(), "timeline");
    }

    #[test]
    fn high_and_critical_projects_are_critical() {
        let mut project = build_project("P1", on_date(2026, 1, 1), on_date(2026, 3, 31), 4.0);
        project.priority = ProjectPriority::Medium;
        assert!(!project.is_critical());
        project.priority = ProjectPriority::High;
        assert!(project.is_critical());
    }
}
