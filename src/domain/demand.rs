use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::time_window::TimeWindow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectPhase {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub team_size: f64,
    #[serde(default)]
    pub required_skills: Vec<String>,
    /// Share of the team's time the phase consumes, 0-1.
    pub utilization_rate: f64,
}

impl ProjectPhase {
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_date,
            end: Some(self.end_date.max(self.start_date)),
        }
    }

    /// FTE demand on any active day.
    pub fn daily_demand(&self) -> f64 {
        (self.team_size * self.utilization_rate).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDemandProfile {
    pub project_id: String,
    pub project_name: String,
    pub phases: Vec<ProjectPhase>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyDemand {
    pub date: NaiveDate,
    pub total: f64,
    pub by_skill: BTreeMap<String, f64>,
    pub by_project: BTreeMap<String, f64>,
}

/// Day-indexed staffing demand, one entry per day of the horizon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandCurve {
    pub start: NaiveDate,
    pub days: Vec<DailyDemand>,
}

impl DemandCurve {
    pub fn horizon(&self) -> TimeWindow {
        TimeWindow::from_horizon(self.start, self.days.len())
    }

    pub fn totals(&self) -> Vec<f64> {
        self.days.iter().map(|day| day.total).collect()
    }

    /// Daily demand for one skill, zero on days the skill is not needed.
    pub fn skill_series(&self, skill: &str) -> Vec<f64> {
        self.days
            .iter()
            .map(|day| day.by_skill.get(skill).copied().unwrap_or(0.0))
            .collect()
    }

    pub fn skills(&self) -> Vec<String> {
        let mut skills: Vec<String> = self
            .days
            .iter()
            .flat_map(|day| day.by_skill.keys().cloned())
            .collect();
        skills.sort();
        skills.dedup();
        skills
    }

    /// Total effort over the horizon in FTE-days.
    pub fn total_fte_days(&self) -> f64 {
        self.days.iter().map(|day| day.total).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakDemand {
    pub date: NaiveDate,
    pub total: f64,
    /// Contributing projects, largest share first.
    pub projects: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillBottleneck {
    pub skill: String,
    pub peak_demand: f64,
    pub peak_date: NaiveDate,
    pub average_demand: f64,
    pub peak_to_average: f64,
}
