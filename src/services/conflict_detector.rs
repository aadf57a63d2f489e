//! Over-allocation detection for scenario allocations.
//!
//! Detection is after the fact: [`find_conflicts`] and
//! [`overallocated_periods`] report states that already exceed 100%.
//! [`validate_capacity`] is the one preventive check, run before a write.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::domain::allocation::ScenarioAllocation;
use crate::domain::time_window::TimeWindow;

pub const FULL_ALLOCATION: f64 = 100.0;
/// Absorbs floating point noise when summing percentages.
const PERCENT_TOLERANCE: f64 = 1e-9;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConflictError {
    #[error(
        "capacity exceeded for employee {employee_id}: {existing_percentage}% already allocated, {requested_percentage}% requested"
    )]
    CapacityExceeded {
        employee_id: String,
        existing_percentage: f64,
        requested_percentage: f64,
    },
    #[error("allocation percentage {0} is outside 0-100")]
    InvalidPercentage(f64),
}

/// Two allocations of one employee to different projects whose overlap
/// pushes the employee past 100%.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationConflict {
    pub employee_id: String,
    pub first_allocation_id: String,
    pub second_allocation_id: String,
    pub projects: (String, String),
    pub window: TimeWindow,
    pub total_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeConflictSummary {
    pub employee_id: String,
    /// Smallest window covering every conflicting overlap of the employee.
    pub window: TimeWindow,
    pub peak_percentage: f64,
    pub conflict_count: usize,
    pub allocation_ids: Vec<String>,
}

/// A run of consecutive days on which an employee's summed allocation
/// exceeds 100%.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallocationPeriod {
    pub employee_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub peak_percentage: f64,
    pub allocation_ids: Vec<String>,
}

pub fn find_conflicts(allocations: &[ScenarioAllocation]) -> Vec<AllocationConflict> {
    let mut by_employee: BTreeMap<&str, Vec<&ScenarioAllocation>> = BTreeMap::new();
    for allocation in allocations {
        by_employee
            .entry(allocation.employee_id.as_str())
            .or_default()
            .push(allocation);
    }

    let mut conflicts = Vec::new();
    for (employee_id, assigned) in by_employee {
        for (index, first) in assigned.iter().enumerate() {
            for second in &assigned[index + 1..] {
                if first.project_id == second.project_id {
                    continue;
                }
                let total = first.allocation_percentage + second.allocation_percentage;
                if total <= FULL_ALLOCATION + PERCENT_TOLERANCE {
                    continue;
                }
                if let Some(window) = first.window().intersection(&second.window()) {
                    conflicts.push(AllocationConflict {
                        employee_id: employee_id.to_string(),
                        first_allocation_id: first.id.clone(),
                        second_allocation_id: second.id.clone(),
                        projects: (first.project_id.clone(), second.project_id.clone()),
                        window,
                        total_percentage: total,
                    });
                }
            }
        }
    }
    conflicts
}

pub fn group_by_employee(conflicts: &[AllocationConflict]) -> Vec<EmployeeConflictSummary> {
    let mut summaries: BTreeMap<&str, EmployeeConflictSummary> = BTreeMap::new();
    for conflict in conflicts {
        let summary = summaries
            .entry(conflict.employee_id.as_str())
            .or_insert_with(|| EmployeeConflictSummary {
                employee_id: conflict.employee_id.clone(),
                window: conflict.window,
                peak_percentage: conflict.total_percentage,
                conflict_count: 0,
                allocation_ids: Vec::new(),
            });
        summary.window = summary.window.span(&conflict.window);
        summary.peak_percentage = summary.peak_percentage.max(conflict.total_percentage);
        summary.conflict_count += 1;
        for id in [&conflict.first_allocation_id, &conflict.second_allocation_id] {
            if !summary.allocation_ids.contains(id) {
                summary.allocation_ids.push(id.clone());
            }
        }
    }
    summaries.into_values().collect()
}

/// Day sweep over `horizon` that merges consecutive over-allocated days per
/// employee. Unlike the pairwise check this sees three or more overlapping
/// allocations whose pairs each stay within 100%.
pub fn overallocated_periods(
    allocations: &[ScenarioAllocation],
    horizon: &TimeWindow,
) -> Vec<OverallocationPeriod> {
    let mut usage: BTreeMap<&str, BTreeMap<NaiveDate, (f64, Vec<&str>)>> = BTreeMap::new();
    for allocation in allocations {
        let days = usage.entry(allocation.employee_id.as_str()).or_default();
        for date in allocation.window().days_within(horizon) {
            let day = days.entry(date).or_insert((0.0, Vec::new()));
            day.0 += allocation.allocation_percentage;
            day.1.push(allocation.id.as_str());
        }
    }

    let mut periods = Vec::new();
    for (employee_id, days) in usage {
        let mut current: Option<OverallocationPeriod> = None;
        for (date, (total, ids)) in days {
            if total <= FULL_ALLOCATION + PERCENT_TOLERANCE {
                if let Some(period) = current.take() {
                    periods.push(period);
                }
                continue;
            }
            match current.as_mut() {
                Some(period) if period.end.succ_opt() == Some(date) => {
                    period.end = date;
                    period.peak_percentage = period.peak_percentage.max(total);
                    for id in ids {
                        if !period.allocation_ids.iter().any(|known| known == id) {
                            period.allocation_ids.push(id.to_string());
                        }
                    }
                }
                _ => {
                    if let Some(period) = current.take() {
                        periods.push(period);
                    }
                    current = Some(OverallocationPeriod {
                        employee_id: employee_id.to_string(),
                        start: date,
                        end: date,
                        peak_percentage: total,
                        allocation_ids: ids.iter().map(|id| id.to_string()).collect(),
                    });
                }
            }
        }
        if let Some(period) = current {
            periods.push(period);
        }
    }
    periods
}

/// A proposed allocation checked before it is written.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityRequest<'a> {
    pub employee_id: &'a str,
    pub scenario_id: &'a str,
    pub window: TimeWindow,
    pub percentage: f64,
    /// The allocation being updated, left out of the sum.
    pub exclude_id: Option<&'a str>,
}

/// Rejects the request when the employee's other allocations in the same
/// scenario that overlap the window, plus the new percentage, exceed 100%.
pub fn validate_capacity(
    existing: &[ScenarioAllocation],
    request: &CapacityRequest<'_>,
) -> Result<(), ConflictError> {
    if !(0.0..=FULL_ALLOCATION).contains(&request.percentage) {
        return Err(ConflictError::InvalidPercentage(request.percentage));
    }

    let existing_percentage: f64 = existing
        .iter()
        .filter(|allocation| allocation.employee_id == request.employee_id)
        .filter(|allocation| allocation.scenario_id == request.scenario_id)
        .filter(|allocation| Some(allocation.id.as_str()) != request.exclude_id)
        .filter(|allocation| allocation.window().overlaps(&request.window))
        .map(|allocation| allocation.allocation_percentage)
        .sum();

    if existing_percentage + request.percentage > FULL_ALLOCATION + PERCENT_TOLERANCE {
        return Err(ConflictError::CapacityExceeded {
            employee_id: request.employee_id.to_string(),
            existing_percentage,
            requested_percentage: request.percentage,
        });
    }
    Ok(())
}

/// Employees that appear in at least one conflict.
pub fn conflicted_employees(conflicts: &[AllocationConflict]) -> BTreeSet<String> {
    conflicts
        .iter()
        .map(|conflict| conflict.employee_id.clone())
        .collect()
}
