use crate::domain::forecast::ForecastResult;
use crate::services::comparison::ScenarioComparison;
use crate::services::evaluation_types::{ScenarioResult, SkillGap, UtilizationSeverity, ViolationSeverity};
use crate::services::planning_service::ConflictReport;
use crate::services::risk_simulation::RiskLevel;
use crate::services::scenario_optimizer::{OptimizationResult, TerminationReason};
use crate::services::sensitivity_analysis::SensitivityReport;

pub fn format_evaluation_report(result: &ScenarioResult) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Scenario Evaluation: {} ({})", result.scenario_name, result.scenario_id));
    lines.push(format!("Base date: {}", result.base_date));
    lines.push(format!("Horizon: {} days", result.horizon_days));
    lines.push(format!("Included projects: {}", join_or_none(&result.included_projects)));
    lines.push(format!("Excluded projects: {}", join_or_none(&result.excluded_projects)));
    lines.push(String::new());

    lines.push("Utilization:".to_string());
    lines.push(format!("Capacity: {:.1} FTE", result.utilization.total_capacity));
    lines.push(format!("Average: {}", percent(result.utilization.average_utilization)));
    lines.push(format!("Peak: {}", percent(result.utilization.peak_utilization)));
    for peak in &result.utilization.peaks {
        lines.push(format!(
            "  {} - {} | {} | {}",
            peak.start,
            peak.end,
            percent(peak.peak_utilization),
            utilization_label(peak.severity)
        ));
    }
    lines.push(String::new());

    lines.push(format!(
        "Demand: {:.1} FTE-days, {:.2} FTE/day on average",
        result.demand.total_fte_days, result.demand.average_daily_demand
    ));
    if let Some(peak) = &result.demand.peak {
        lines.push(format!("Peak demand: {:.2} FTE on {}", peak.total, peak.date));
    }
    if let Some(forecast) = &result.capacity_forecast {
        lines.push(format!(
            "Committed load: {:.2} FTE average, trend {}, confidence {:.2}",
            forecast.average_committed_load, forecast.trend, forecast.confidence
        ));
    }
    lines.push(String::new());

    lines.push("Cost:".to_string());
    lines.push(format!("Projected: {:.2}", result.cost.total_projected_cost));
    if let (Some(budget), Some(variance)) = (result.cost.budget, result.cost.budget_variance) {
        lines.push(format!("Budget: {budget:.2} (variance {variance:.2})"));
    }
    lines.push(String::new());

    lines.push("Risk:".to_string());
    lines.push(format!(
        "Success probability: {}",
        percent(result.risk.success_probability)
    ));
    lines.push(format!("Risk level: {}", risk_label(result.risk.risk_level)));
    lines.push(format!(
        "Duration P50/P85: {:.1} / {:.1} days",
        result.risk.duration.p50, result.risk.duration.p85
    ));
    for factor in &result.risk.risk_factors {
        lines.push(format!("  - {factor}"));
    }
    lines.push(String::new());

    lines.push("Timeline:".to_string());
    lines.push("Project | Planned end | Estimated end | Delay | Critical".to_string());
    lines.push("--------|-------------|---------------|-------|---------".to_string());
    for project in &result.timeline.projects {
        lines.push(format!(
            "{} | {} | {} | {} | {}",
            project.project_id,
            project.planned_end,
            project.estimated_end,
            project.delay_days,
            if project.critical_path { "yes" } else { "no" }
        ));
    }
    lines.push(String::new());

    if result.violations.is_empty() {
        lines.push("Constraints: all satisfied".to_string());
    } else {
        lines.push(format!(
            "Constraints: {} error(s), {} warning(s)",
            result.error_count(),
            result.warning_count()
        ));
        for violation in &result.violations {
            let severity = match violation.severity {
                ViolationSeverity::Error => "ERROR",
                ViolationSeverity::Warning => "WARN",
            };
            lines.push(format!(
                "  [{severity}] {}: {}",
                violation.constraint_type, violation.description
            ));
        }
    }
    if !result.conflicts.is_empty() {
        lines.push(format!("Allocation conflicts: {}", result.conflicts.len()));
    }

    lines.join("\n")
}

pub fn format_comparison_report(comparison: &ScenarioComparison) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Scenario Comparison: {} vs {}",
        comparison.scenario_a, comparison.scenario_b
    ));
    lines.push(format!("Computed at: {}", comparison.computed_at.format("%Y-%m-%d %H:%M:%S")));
    lines.push("Metric | A | B | Change | Preferred".to_string());
    lines.push("-------|---|---|--------|----------".to_string());
    for metric in &comparison.metrics {
        let change = match metric.percent_change {
            Some(percent) => format!("{percent:+.1}%"),
            None => format!("{:+.2}", metric.delta),
        };
        lines.push(format!(
            "{} | {:.2} | {:.2} | {} | {}",
            metric.metric,
            metric.value_a,
            metric.value_b,
            change,
            metric.preferred.as_deref().unwrap_or("tie")
        ));
    }
    lines.push(format!(
        "Preferred overall: {}",
        comparison.preferred.as_deref().unwrap_or("tie")
    ));
    lines.join("\n")
}

pub fn format_conflict_report(report: &ConflictReport) -> String {
    if report.is_clean() {
        return format!("No allocation conflicts in scenario {}", report.scenario_id);
    }
    let mut lines = Vec::new();
    lines.push(format!("Allocation Conflicts: {}", report.scenario_id));
    lines.push(format!("Over-allocated employees: {}", report.employees.len()));
    for summary in &report.by_employee {
        lines.push(format!(
            "{} | {} - {} | peak {:.0}% | {} conflict(s)",
            summary.employee_id,
            summary.window.start,
            summary
                .window
                .end
                .map_or_else(|| "ongoing".to_string(), |end| end.to_string()),
            summary.peak_percentage,
            summary.conflict_count
        ));
    }
    if !report.overallocated_periods.is_empty() {
        lines.push(String::new());
        lines.push("Over-allocated periods:".to_string());
        for period in &report.overallocated_periods {
            lines.push(format!(
                "{} | {} - {} | peak {:.0}% | {}",
                period.employee_id,
                period.start,
                period.end,
                period.peak_percentage,
                period.allocation_ids.join(", ")
            ));
        }
    }
    lines.join("\n")
}

pub fn format_skill_gap_report(scenario_id: &str, gaps: &[SkillGap]) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Skill Gaps: {scenario_id}"));
    lines.push("Skill | Capacity | Average | Peak | Gap | Severity".to_string());
    lines.push("------|----------|---------|------|-----|---------".to_string());
    for gap in gaps {
        lines.push(format!(
            "{} | {:.2} | {:.2} | {:.2} | {:+.2} | {}",
            gap.skill,
            gap.capacity,
            gap.average_demand,
            gap.peak_demand,
            gap.gap,
            gap.severity.map_or("-", utilization_label)
        ));
    }
    lines.join("\n")
}

pub fn format_sensitivity_report(report: &SensitivityReport) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Sensitivity Analysis: {}", report.scenario_id));
    lines.push(format!("Metric: {:?}", report.metric));
    lines.push(format!("Baseline: {:.4}", report.baseline_metric));
    for parameter in &report.parameters {
        lines.push(String::new());
        lines.push(format!(
            "{} (baseline {:.3}, sensitivity {:.4})",
            parameter.parameter_id, parameter.baseline_value, parameter.sensitivity
        ));
        for point in &parameter.points {
            lines.push(format!(
                "  {:+.0}% -> {:.3} | metric {:.4} ({:+.2}%)",
                point.variation * 100.0,
                point.parameter_value,
                point.metric_value,
                point.normalized_change * 100.0
            ));
        }
    }
    lines.join("\n")
}

pub fn format_optimization_report(result: &OptimizationResult) -> String {
    let termination = match result.termination {
        TerminationReason::Converged => "converged",
        TerminationReason::GenerationLimit => "generation limit",
        TerminationReason::Deadline => "deadline",
        TerminationReason::NothingToTune => "nothing to tune",
    };
    let mut lines = Vec::new();
    lines.push(format!("Optimization: {}", result.optimized.id));
    lines.push(format!("Generations: {}", result.fitness_trace.len()));
    lines.push(format!("Stopped by: {termination}"));
    lines.push(format!("Initial fitness: {:.2}", result.initial_fitness));
    lines.push(format!("Best fitness: {:.2}", result.best_fitness));
    if result.failed_evaluations > 0 {
        lines.push(format!("Failed evaluations: {}", result.failed_evaluations));
    }
    lines.push(String::new());
    lines.push("Parameters:".to_string());
    for parameter in &result.optimized.parameters {
        let value = match parameter.value.as_f64() {
            Some(number) => format!("{number:.3}"),
            None => format!("{:?}", parameter.value),
        };
        lines.push(format!("  {} = {}", parameter.id, value));
    }
    lines.push(String::new());
    lines.push(format!(
        "Projected cost: {:.2}",
        result.best_result.cost.total_projected_cost
    ));
    lines.push(format!(
        "Success probability: {}",
        percent(result.best_result.risk.success_probability)
    ));
    lines.push(format!(
        "Average delay: {:.1} days",
        result.best_result.timeline.average_delay_days
    ));
    lines.join("\n")
}

pub fn format_forecast_report(result: &ForecastResult) -> String {
    let metadata = &result.metadata;
    let mut lines = Vec::new();
    lines.push("Forecast".to_string());
    lines.push(format!("Samples: {}", metadata.sample_count));
    lines.push(format!("Trend: {} (slope {:.4})", metadata.trend, metadata.slope));
    lines.push(format!("Confidence: {:.2}", metadata.confidence));
    match metadata.seasonal_period {
        Some(period) => lines.push(format!("Seasonality: every {period} days")),
        None => lines.push("Seasonality: none".to_string()),
    }
    lines.push(String::new());
    lines.push("Date | Predicted | Lower | Upper".to_string());
    lines.push("-----|-----------|-------|------".to_string());
    for point in &result.points {
        lines.push(format!(
            "{} | {:.2} | {:.2} | {:.2}",
            point.date, point.predicted, point.lower_bound, point.upper_bound
        ));
    }
    lines.join("\n")
}

fn percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

fn join_or_none(ids: &[String]) -> String {
    if ids.is_empty() {
        "none".to_string()
    } else {
        ids.join(", ")
    }
}

fn utilization_label(severity: UtilizationSeverity) -> &'static str {
    match severity {
        UtilizationSeverity::Low => "low",
        UtilizationSeverity::Medium => "medium",
        UtilizationSeverity::High => "high",
    }
}

fn risk_label(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "low",
        RiskLevel::Medium => "medium",
        RiskLevel::High => "high",
    }
}
