use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::allocation::{Allocation, ScenarioAllocation};
use crate::domain::scenario::Scenario;
use crate::domain::time_window::TimeWindow;
use crate::services::comparison::StoredComparison;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("scenario not found: {0}")]
    ScenarioNotFound(String),
    #[error("scenario allocation not found: {0}")]
    AllocationNotFound(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationFilter {
    pub employee_id: Option<String>,
    pub project_id: Option<String>,
    pub window: Option<TimeWindow>,
}

impl AllocationFilter {
    pub fn matches(&self, allocation: &Allocation) -> bool {
        self.employee_id
            .as_ref()
            .is_none_or(|id| *id == allocation.employee_id)
            && self
                .project_id
                .as_ref()
                .is_none_or(|id| *id == allocation.project_id)
            && self
                .window
                .as_ref()
                .is_none_or(|window| window.overlaps(&allocation.window()))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioAllocationFilter {
    pub employee_id: Option<String>,
    pub project_id: Option<String>,
}

impl ScenarioAllocationFilter {
    pub fn matches(&self, allocation: &ScenarioAllocation) -> bool {
        self.employee_id
            .as_ref()
            .is_none_or(|id| *id == allocation.employee_id)
            && self
                .project_id
                .as_ref()
                .is_none_or(|id| *id == allocation.project_id)
    }
}

/// Read access to committed allocations.
pub trait AllocationSource {
    fn list_allocations(&self, filter: &AllocationFilter) -> Result<Vec<Allocation>, RepositoryError>;
}

/// Persistence of scenarios and their allocations.
pub trait ScenarioRepository {
    /// Soft-deleted scenarios are returned too; callers decide what a
    /// deletion means.
    fn get_scenario(&self, id: &str) -> Result<Scenario, RepositoryError>;
    fn list_scenarios(&self) -> Result<Vec<Scenario>, RepositoryError>;
    /// Inserts or replaces by id.
    fn save_scenario(&self, scenario: Scenario) -> Result<(), RepositoryError>;
    fn list_scenario_allocations(
        &self,
        scenario_id: &str,
        filter: &ScenarioAllocationFilter,
    ) -> Result<Vec<ScenarioAllocation>, RepositoryError>;
    fn get_scenario_allocation(&self, id: &str) -> Result<ScenarioAllocation, RepositoryError>;
    /// Inserts or replaces by id.
    fn save_scenario_allocation(&self, allocation: ScenarioAllocation) -> Result<(), RepositoryError>;
    fn delete_scenario_allocation(&self, id: &str) -> Result<(), RepositoryError>;
    /// Comparisons saved by earlier runs, expired ones included.
    fn list_comparisons(&self) -> Result<Vec<StoredComparison>, RepositoryError>;
    fn replace_comparisons(&self, comparisons: Vec<StoredComparison>) -> Result<(), RepositoryError>;
}

/// Everything the planning engine persists, as stored in a workspace file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
    #[serde(default)]
    pub scenario_allocations: Vec<ScenarioAllocation>,
    /// Committed allocations from the resource-management store.
    #[serde(default)]
    pub allocations: Vec<Allocation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comparisons: Vec<StoredComparison>,
}

#[derive(Debug, Default)]
pub struct InMemoryRepository {
    workspace: RwLock<Workspace>,
}

impl InMemoryRepository {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace: RwLock::new(workspace),
        }
    }

    /// A copy of the current contents, for writing back to disk.
    pub fn snapshot(&self) -> Workspace {
        self.workspace
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn read<T>(&self, f: impl FnOnce(&Workspace) -> T) -> T {
        f(&self.workspace.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Workspace) -> T) -> T {
        f(&mut self.workspace.write().unwrap_or_else(PoisonError::into_inner))
    }
}

impl AllocationSource for InMemoryRepository {
    fn list_allocations(&self, filter: &AllocationFilter) -> Result<Vec<Allocation>, RepositoryError> {
        Ok(self.read(|workspace| {
            workspace
                .allocations
                .iter()
                .filter(|allocation| filter.matches(allocation))
                .cloned()
                .collect()
        }))
    }
}

impl ScenarioRepository for InMemoryRepository {
    fn get_scenario(&self, id: &str) -> Result<Scenario, RepositoryError> {
        self.read(|workspace| {
            workspace
                .scenarios
                .iter()
                .find(|scenario| scenario.id == id)
                .cloned()
                .ok_or_else(|| RepositoryError::ScenarioNotFound(id.to_string()))
        })
    }

    fn list_scenarios(&self) -> Result<Vec<Scenario>, RepositoryError> {
        Ok(self.read(|workspace| workspace.scenarios.clone()))
    }

    fn save_scenario(&self, scenario: Scenario) -> Result<(), RepositoryError> {
        self.write(|workspace| {
            match workspace.scenarios.iter_mut().find(|s| s.id == scenario.id) {
                Some(existing) => *existing = scenario,
                None => workspace.scenarios.push(scenario),
            }
        });
        Ok(())
    }

    fn list_scenario_allocations(
        &self,
        scenario_id: &str,
        filter: &ScenarioAllocationFilter,
    ) -> Result<Vec<ScenarioAllocation>, RepositoryError> {
        Ok(self.read(|workspace| {
            workspace
                .scenario_allocations
                .iter()
                .filter(|allocation| allocation.scenario_id == scenario_id)
                .filter(|allocation| filter.matches(allocation))
                .cloned()
                .collect()
        }))
    }

    fn get_scenario_allocation(&self, id: &str) -> Result<ScenarioAllocation, RepositoryError> {
        self.read(|workspace| {
            workspace
                .scenario_allocations
                .iter()
                .find(|allocation| allocation.id == id)
                .cloned()
                .ok_or_else(|| RepositoryError::AllocationNotFound(id.to_string()))
        })
    }

    fn save_scenario_allocation(&self, allocation: ScenarioAllocation) -> Result<(), RepositoryError> {
        self.write(|workspace| {
            match workspace
                .scenario_allocations
                .iter_mut()
                .find(|existing| existing.id == allocation.id)
            {
                Some(existing) => *existing = allocation,
                None => workspace.scenario_allocations.push(allocation),
            }
        });
        Ok(())
    }

    fn delete_scenario_allocation(&self, id: &str) -> Result<(), RepositoryError> {
        self.write(|workspace| {
            let before = workspace.scenario_allocations.len();
            workspace.scenario_allocations.retain(|allocation| allocation.id != id);
            if workspace.scenario_allocations.len() == before {
                Err(RepositoryError::AllocationNotFound(id.to_string()))
            } else {
                Ok(())
            }
        })
    }

    fn list_comparisons(&self) -> Result<Vec<StoredComparison>, RepositoryError> {
        Ok(self.read(|workspace| workspace.comparisons.clone()))
    }

    fn replace_comparisons(&self, comparisons: Vec<StoredComparison>) -> Result<(), RepositoryError> {
        self.write(|workspace| workspace.comparisons = comparisons);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{build_scenario, build_scenario_allocation, on_date};

    fn committed(employee: &str, project: &str, start: (i32, u32, u32)) -> Allocation {
        Allocation {
            employee_id: employee.to_string(),
            project_id: project.to_string(),
            start_date: on_date(start.0, start.1, start.2),
            end_date: Some(on_date(start.0, start.1, start.2 + 9)),
            allocation_percentage: 50.0,
            hourly_rate: None,
        }
    }

    #[test]
    fn allocation_filters_combine() {
        let repository = InMemoryRepository::new(Workspace {
            allocations: vec![
                committed("E1", "P1", (2026, 1, 1)),
                committed("E1", "P2", (2026, 3, 1)),
                committed("E2", "P1", (2026, 1, 1)),
            ],
            ..Workspace::default()
        });

        let filter = AllocationFilter {
            employee_id: Some("E1".to_string()),
            window: Some(TimeWindow::closed(on_date(2026, 2, 1), on_date(2026, 3, 5)).unwrap()),
            ..AllocationFilter::default()
        };
        let found = repository.list_allocations(&filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].project_id, "P2");
        assert_eq!(
            repository
                .list_allocations(&AllocationFilter::default())
                .unwrap()
                .len(),
            3
        );
    }

    #[test]
    fn saves_upsert_and_deletes_report_misses() {
        let repository = InMemoryRepository::default();
        repository.save_scenario(build_scenario("S1", vec![])).unwrap();
        let mut renamed = build_scenario("S1", vec![]);
        renamed.name = "Renamed".to_string();
        repository.save_scenario(renamed).unwrap();
        assert_eq!(repository.list_scenarios().unwrap().len(), 1);
        assert_eq!(repository.get_scenario("S1").unwrap().name, "Renamed");
        assert_eq!(
            repository.get_scenario("S9"),
            Err(RepositoryError::ScenarioNotFound("S9".to_string()))
        );

        let allocation =
            build_scenario_allocation("A1", "E1", "P1", 50.0, on_date(2026, 1, 1), None);
        repository.save_scenario_allocation(allocation).unwrap();
        assert_eq!(
            repository
                .list_scenario_allocations("S1", &ScenarioAllocationFilter::default())
                .unwrap()
                .len(),
            1
        );
        repository.delete_scenario_allocation("A1").unwrap();
        assert_eq!(
            repository.delete_scenario_allocation("A1"),
            Err(RepositoryError::AllocationNotFound("A1".to_string()))
        );
        assert!(repository.snapshot().scenario_allocations.is_empty());
    }
}
