use std::time::{Duration, Instant};

use crate::commands::base_commands::{Commands, GlobalArgs};
use crate::commands::command_context::{CommandError, open_service, save_service, write_output};
use crate::commands::report_format::format_optimization_report;
use crate::services::planning_service::{OptimizationRequest, ScenarioUpdate};
use crate::services::scenario_optimizer::OptimizationObjectives;

pub fn optimize_command(global: &GlobalArgs, cmd: Commands) -> Result<(), CommandError> {
    if let Commands::Optimize {
        scenario,
        generations,
        population,
        cost_weight,
        timeline_weight,
        risk_weight,
        time_limit,
        apply,
        output,
    } = cmd
    {
        let service = open_service(global)?;
        let request = OptimizationRequest {
            objectives: OptimizationObjectives {
                cost_weight,
                timeline_weight,
                risk_weight,
            },
            constraints: Vec::new(),
            generations: Some(generations),
            population_size: Some(population),
            deadline: time_limit.map(|seconds| Instant::now() + Duration::from_secs(seconds)),
        };
        let result = service.optimize_scenario(&scenario, request)?;
        println!("{}", format_optimization_report(&result));

        if apply {
            service.update_scenario(
                &scenario,
                ScenarioUpdate {
                    parameters: Some(result.optimized.parameters.clone()),
                    ..ScenarioUpdate::default()
                },
            )?;
            save_service(global, &service)?;
            println!("Optimized parameters saved to scenario {scenario}");
        }
        if let Some(path) = output {
            write_output(&path, &result)?;
        }
    }
    Ok(())
}
