use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use crate::domain::demand::{
    DailyDemand, DemandCurve, PeakDemand, ProjectDemandProfile, SkillBottleneck,
};
use crate::domain::time_window::TimeWindow;
use crate::services::statistics::mean;

/// A skill is a bottleneck when its peak exceeds its average by this factor.
pub const BOTTLENECK_RATIO: f64 = 1.5;

/// Builds the per-day demand curve over `days` days from `start`.
///
/// Each active phase contributes `team_size * utilization_rate` to the day's
/// total, split equally across its required skills. Phases without skills
/// count towards the total only.
pub fn aggregate(profiles: &[ProjectDemandProfile], start: NaiveDate, days: usize) -> DemandCurve {
    let horizon = TimeWindow::from_horizon(start, days);
    let mut curve: Vec<DailyDemand> = (0..days)
        .map(|offset| DailyDemand {
            date: start + Duration::days(offset as i64),
            total: 0.0,
            by_skill: BTreeMap::new(),
            by_project: BTreeMap::new(),
        })
        .collect();

    for profile in profiles {
        for phase in &profile.phases {
            let demand = phase.daily_demand();
            if demand <= 0.0 {
                continue;
            }
            let per_skill = if phase.required_skills.is_empty() {
                0.0
            } else {
                demand / phase.required_skills.len() as f64
            };
            for date in phase.window().days_within(&horizon) {
                let offset = date.signed_duration_since(start).num_days() as usize;
                let Some(day) = curve.get_mut(offset) else {
                    continue;
                };
                day.total += demand;
                *day.by_project.entry(profile.project_id.clone()).or_insert(0.0) += demand;
                for skill in &phase.required_skills {
                    *day.by_skill.entry(skill.clone()).or_insert(0.0) += per_skill;
                }
            }
        }
    }

    DemandCurve { start, days: curve }
}

/// The first day with the highest total demand. `None` when the curve is
/// empty or carries no demand at all.
pub fn peak_demand(curve: &DemandCurve) -> Option<PeakDemand> {
    let peak = curve
        .days
        .iter()
        .filter(|day| day.total > 0.0)
        .fold(None::<&DailyDemand>, |best, day| match best {
            Some(best) if best.total >= day.total => Some(best),
            _ => Some(day),
        })?;

    let mut projects: Vec<(String, f64)> = peak
        .by_project
        .iter()
        .map(|(project, demand)| (project.clone(), *demand))
        .collect();
    projects.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    Some(PeakDemand {
        date: peak.date,
        total: peak.total,
        projects,
    })
}

/// Skills whose peak daily demand exceeds [`BOTTLENECK_RATIO`] times their
/// average over the whole horizon, highest peak first.
pub fn skill_bottlenecks(curve: &DemandCurve) -> Vec<SkillBottleneck> {
    let mut bottlenecks: Vec<SkillBottleneck> = curve
        .skills()
        .into_iter()
        .filter_map(|skill| {
            let series = curve.skill_series(&skill);
            let average = mean(&series);
            let (peak_index, peak) = series.iter().copied().enumerate().fold(
                (0, f64::NEG_INFINITY),
                |best, (index, value)| if value > best.1 { (index, value) } else { best },
            );
            if average <= 0.0 || peak <= average * BOTTLENECK_RATIO {
                return None;
            }
            Some(SkillBottleneck {
                skill,
                peak_demand: peak,
                peak_date: curve.days[peak_index].date,
                average_demand: average,
                peak_to_average: peak / average,
            })
        })
        .collect();

    bottlenecks.sort_by(|a, b| {
        b.peak_demand
            .partial_cmp(&a.peak_demand)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    bottlenecks
}
