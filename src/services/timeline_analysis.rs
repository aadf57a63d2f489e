use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use thiserror::Error;

use crate::domain::scenario::{ProjectPriority, ScenarioProject};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimelineError {
    #[error("project dependency graph has a cycle")]
    CyclicDependencies,
    #[error("dependency {dependency} not found for project {project}")]
    UnknownDependency { project: String, dependency: String },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProjectTimeline {
    pub project_id: String,
    pub name: String,
    pub priority: ProjectPriority,
    pub planned_start: NaiveDate,
    pub planned_end: NaiveDate,
    pub estimated_start: NaiveDate,
    pub estimated_end: NaiveDate,
    /// Days the estimated end slips past the planned end.
    pub delay_days: i64,
    pub critical_path: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TimelineAnalysis {
    pub projects: Vec<ProjectTimeline>,
    pub estimated_completion: Option<NaiveDate>,
    pub average_delay_days: f64,
    pub critical_path_delay_days: i64,
}

/// Checks that every declared dependency names a known project.
pub fn validate_dependencies(projects: &[ScenarioProject]) -> Result<(), TimelineError> {
    for project in projects {
        for dependency in &project.depends_on {
            if !projects.iter().any(|candidate| &candidate.id == dependency) {
                return Err(TimelineError::UnknownDependency {
                    project: project.id.clone(),
                    dependency: dependency.clone(),
                });
            }
        }
    }
    dependency_order(projects).map(|_| ())
}

/// Estimates start and end dates. Each project starts no earlier than the
/// day after its predecessors' estimated ends and slips by its simulated
/// p85 duration multiplier. Dependencies on projects outside the set are
/// ignored.
pub fn analyze_timeline(
    projects: &[ScenarioProject],
    duration_multiplier_p85: &BTreeMap<String, f64>,
) -> Result<TimelineAnalysis, TimelineError> {
    let order = dependency_order(projects)?;
    let by_id: HashMap<&str, &ScenarioProject> = projects
        .iter()
        .map(|project| (project.id.as_str(), project))
        .collect();

    let mut estimated_ends: HashMap<&str, NaiveDate> = HashMap::new();
    let mut timelines = Vec::with_capacity(projects.len());
    for id in &order {
        let Some(project) = by_id.get(id.as_str()) else {
            continue;
        };
        let earliest_after_dependencies = project
            .depends_on
            .iter()
            .filter_map(|dependency| estimated_ends.get(dependency.as_str()))
            .map(|end| *end + Duration::days(1))
            .max();
        let estimated_start = earliest_after_dependencies
            .map_or(project.start_date, |date| date.max(project.start_date));

        let duration = project.duration_days();
        let multiplier = duration_multiplier_p85
            .get(&project.id)
            .copied()
            .unwrap_or(1.0);
        let slip = ((duration as f64) * (multiplier - 1.0)).ceil().max(0.0) as i64;
        let estimated_end = estimated_start + Duration::days(duration - 1 + slip);
        estimated_ends.insert(project.id.as_str(), estimated_end);

        timelines.push(ProjectTimeline {
            project_id: project.id.clone(),
            name: project.name.clone(),
            priority: project.priority,
            planned_start: project.start_date,
            planned_end: project.end_date,
            estimated_start,
            estimated_end,
            delay_days: estimated_end
                .signed_duration_since(project.end_date)
                .num_days()
                .max(0),
            critical_path: project.is_critical(),
        });
    }

    let average_delay_days = if timelines.is_empty() {
        0.0
    } else {
        timelines.iter().map(|t| t.delay_days as f64).sum::<f64>() / timelines.len() as f64
    };
    let critical_path_delay_days = timelines
        .iter()
        .filter(|timeline| timeline.critical_path)
        .map(|timeline| timeline.delay_days)
        .max()
        .unwrap_or(0);

    Ok(TimelineAnalysis {
        estimated_completion: timelines.iter().map(|timeline| timeline.estimated_end).max(),
        projects: timelines,
        average_delay_days,
        critical_path_delay_days,
    })
}

fn dependency_order(projects: &[ScenarioProject]) -> Result<Vec<String>, TimelineError> {
    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let mut indices: HashMap<String, NodeIndex> = HashMap::new();
    for project in projects {
        indices
            .entry(project.id.clone())
            .or_insert_with(|| graph.add_node(project.id.clone()));
    }
    for project in projects {
        let Some(project_idx) = indices.get(&project.id).copied() else {
            continue;
        };
        for dependency in &project.depends_on {
            if let Some(dependency_idx) = indices.get(dependency) {
                graph.add_edge(*dependency_idx, project_idx, ());
            }
        }
    }

    let sorted = toposort(&graph, None).map_err(|_| TimelineError::CyclicDependencies)?;
    Ok(sorted
        .into_iter()
        .filter_map(|idx| graph.node_weight(idx).cloned())
        .collect())
}
