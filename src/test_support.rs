use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::allocation::{AllocationType, ScenarioAllocation};
use crate::domain::scenario::{
    ProjectPriority, ProjectType, Scenario, ScenarioProject, ScenarioStatus, ScenarioType,
};

pub fn on_date(year: i32, month: u32, day: u32) -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn fixed_timestamp() -> DateTime<Utc> {
    on_date(2025, 12, 1).and_hms_opt(9, 0, 0).unwrap().and_utc()
}

pub fn build_project(id: &str, start: NaiveDate, end: NaiveDate, team_size: f64) -> ScenarioProject {
    ScenarioProject {
        id: id.to_string(),
        name: format!("Project {id}"),
        project_type: ProjectType::Other,
        priority: ProjectPriority::Medium,
        probability: 1.0,
        start_date: start,
        end_date: end,
        team_size,
        required_skills: vec!["engineering".to_string()],
        phases: vec![],
        depends_on: vec![],
    }
}

pub fn build_scenario(id: &str, projects: Vec<ScenarioProject>) -> Scenario {
    Scenario {
        id: id.to_string(),
        name: format!("Scenario {id}"),
        description: String::new(),
        scenario_type: ScenarioType::WhatIf,
        status: ScenarioStatus::Draft,
        base_date: on_date(2026, 1, 1),
        forecast_horizon_months: 12,
        parameters: vec![],
        constraints: vec![],
        projects,
        created_at: fixed_timestamp(),
        updated_at: fixed_timestamp(),
        deleted_at: None,
    }
}

pub fn build_scenario_allocation(
    id: &str,
    employee_id: &str,
    project_id: &str,
    percentage: f64,
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> ScenarioAllocation {
    ScenarioAllocation {
        id: id.to_string(),
        scenario_id: "S1".to_string(),
        project_id: project_id.to_string(),
        employee_id: employee_id.to_string(),
        role_id: None,
        allocation_type: AllocationType::Tentative,
        allocation_percentage: percentage,
        start_date: start,
        end_date: end,
        estimated_hours: None,
        hourly_rate: None,
        confidence_level: 1.0,
    }
}
