use chrono::Duration;

use crate::domain::demand::{ProjectDemandProfile, ProjectPhase};
use crate::domain::scenario::{ProjectType, ScenarioProject};

/// One phase of a template: share of the project duration, share of the
/// team involved, and how busy that part of the team is.
#[derive(Debug, Clone, Copy)]
pub struct PhaseTemplate {
    pub name: &'static str,
    pub duration_share: f64,
    pub team_share: f64,
    pub utilization_rate: f64,
}

const SOFTWARE: [PhaseTemplate; 4] = [
    PhaseTemplate { name: "discovery", duration_share: 0.15, team_share: 0.4, utilization_rate: 0.6 },
    PhaseTemplate { name: "build", duration_share: 0.55, team_share: 1.0, utilization_rate: 0.9 },
    PhaseTemplate { name: "stabilization", duration_share: 0.2, team_share: 0.8, utilization_rate: 0.8 },
    PhaseTemplate { name: "handover", duration_share: 0.1, team_share: 0.3, utilization_rate: 0.5 },
];

const INFRASTRUCTURE: [PhaseTemplate; 3] = [
    PhaseTemplate { name: "design", duration_share: 0.25, team_share: 0.5, utilization_rate: 0.7 },
    PhaseTemplate { name: "rollout", duration_share: 0.6, team_share: 1.0, utilization_rate: 0.85 },
    PhaseTemplate { name: "operations_handover", duration_share: 0.15, team_share: 0.4, utilization_rate: 0.5 },
];

const RESEARCH: [PhaseTemplate; 3] = [
    PhaseTemplate { name: "exploration", duration_share: 0.4, team_share: 0.6, utilization_rate: 0.7 },
    PhaseTemplate { name: "experimentation", duration_share: 0.45, team_share: 1.0, utilization_rate: 0.8 },
    PhaseTemplate { name: "write_up", duration_share: 0.15, team_share: 0.5, utilization_rate: 0.6 },
];

const CONSULTING: [PhaseTemplate; 2] = [
    PhaseTemplate { name: "assessment", duration_share: 0.3, team_share: 0.7, utilization_rate: 0.8 },
    PhaseTemplate { name: "delivery", duration_share: 0.7, team_share: 1.0, utilization_rate: 0.9 },
];

const OTHER: [PhaseTemplate; 1] = [PhaseTemplate {
    name: "execution",
    duration_share: 1.0,
    team_share: 1.0,
    utilization_rate: 0.8,
}];

pub fn template_for(project_type: ProjectType) -> &'static [PhaseTemplate] {
    match project_type {
        ProjectType::Software => &SOFTWARE,
        ProjectType::Infrastructure => &INFRASTRUCTURE,
        ProjectType::Research => &RESEARCH,
        ProjectType::Consulting => &CONSULTING,
        ProjectType::Other => &OTHER,
    }
}

/// The project's demand profile: its own phases when it declares any,
/// otherwise phases synthesized from the template for its type.
pub fn demand_profile(project: &ScenarioProject) -> ProjectDemandProfile {
    let phases = if project.phases.is_empty() {
        synthesize_phases(project)
    } else {
        project.phases.clone()
    };
    ProjectDemandProfile {
        project_id: project.id.clone(),
        project_name: project.name.clone(),
        phases,
    }
}

/// Splits the project window into consecutive phases. Every day of the
/// window belongs to exactly one phase; the last phase absorbs rounding.
pub fn synthesize_phases(project: &ScenarioProject) -> Vec<ProjectPhase> {
    let template = template_for(project.project_type);
    let total_days = project.duration_days().max(1);
    let mut phases = Vec::with_capacity(template.len());
    let mut next_start = project.start_date;
    let mut consumed = 0_i64;

    for (index, phase) in template.iter().enumerate() {
        let remaining = total_days - consumed;
        if remaining <= 0 {
            break;
        }
        let days = if index + 1 == template.len() {
            remaining
        } else {
            ((total_days as f64 * phase.duration_share).round() as i64).clamp(1, remaining)
        };
        let end = next_start + Duration::days(days - 1);
        phases.push(ProjectPhase {
            name: phase.name.to_string(),
            start_date: next_start,
            end_date: end,
            team_size: project.team_size * phase.team_share,
            required_skills: project.required_skills.clone(),
            utilization_rate: phase.utilization_rate,
        });
        consumed += days;
        next_start = end + Duration::days(1);
    }
    phases
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{build_project, on_date};

    #[test]
    fn every_template_covers_the_whole_duration() {
        for project_type in [
            ProjectType::Software,
            ProjectType::Infrastructure,
            ProjectType::Research,
            ProjectType::Consulting,
            ProjectType::Other,
        ] {
            let share: f64 = template_for(project_type)
                .iter()
                .map(|phase| phase.duration_share)
                .sum();
            assert!((share - 1.0).abs() < 1e-9, "{project_type:?} sums to {share}");
        }
    }

    #[test]
    fn synthesized_phases_are_contiguous_and_cover_the_project() {
        let mut project = build_project("P1", on_date(2026, 1, 1), on_date(2026, 4, 10), 5.0);
        project.project_type = ProjectType::Software;
        let phases = synthesize_phases(&project);

        assert_eq!(phases.len(), 4);
        assert_eq!(phases[0].start_date, project.start_date);
        assert_eq!(phases[3].end_date, project.end_date);
        for pair in phases.windows(2) {
            assert_eq!(pair[0].end_date + Duration::days(1), pair[1].start_date);
        }
        assert_eq!(phases[1].team_size, 5.0);
        assert_eq!(phases[0].team_size, 2.0);
    }

    #[test]
    fn very_short_projects_get_fewer_phases() {
        let mut project = build_project("P1", on_date(2026, 1, 1), on_date(2026, 1, 2), 3.0);
        project.project_type = ProjectType::Software;
        let phases = synthesize_phases(&project);
        assert_eq!(phases.len(), 2);
        assert_eq!(phases[1].end_date, on_date(2026, 1, 2));
    }

    #[test]
    fn declared_phases_are_used_as_is() {
        let mut project = build_project("P1", on_date(2026, 1, 1), on_date(2026, 1, 31), 3.0);
        project.phases = vec![ProjectPhase {
            name: "custom".to_string(),
            start_date: on_date(2026, 1, 10),
            end_date: on_date(2026, 1, 20),
            team_size: 2.0,
            required_skills: vec!["rust".to_string()],
            utilization_rate: 1.0,
        }];
        let profile = demand_profile(&project);
        assert_eq!(profile.phases, project.phases);
        assert_eq!(profile.project_id, "P1");
    }
}
