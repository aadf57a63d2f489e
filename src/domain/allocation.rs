use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::time_window::TimeWindow;

/// A committed allocation read from the resource-management store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub employee_id: String,
    pub project_id: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub allocation_percentage: f64,
    #[serde(default)]
    pub hourly_rate: Option<f64>,
}

impl Allocation {
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_date,
            end: self.end_date,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AllocationType {
    Confirmed,
    Probable,
    #[default]
    Tentative,
}

/// A hypothetical allocation that belongs to exactly one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioAllocation {
    pub id: String,
    pub scenario_id: String,
    pub project_id: String,
    pub employee_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,
    #[serde(default)]
    pub allocation_type: AllocationType,
    /// 0-100.
    pub allocation_percentage: f64,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly_rate: Option<f64>,
    /// 0-1.
    #[serde(default = "default_confidence")]
    pub confidence_level: f64,
}

fn default_confidence() -> f64 {
    1.0
}

impl ScenarioAllocation {
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_date,
            end: self.end_date,
        }
    }

    /// Estimated cost: explicit hours when given, otherwise working the
    /// allocated share of `hours_per_day` over the days inside `horizon`.
    pub fn estimated_cost(&self, horizon: &TimeWindow, hours_per_day: f64) -> f64 {
        let Some(rate) = self.hourly_rate else {
            return 0.0;
        };
        let hours = match self.estimated_hours {
            Some(hours) => hours,
            None => {
                let days = self.window().days_within(horizon).count() as f64;
                days * hours_per_day * self.allocation_percentage / 100.0
            }
        };
        hours * rate
    }
}
