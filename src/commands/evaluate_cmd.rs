use crate::commands::base_commands::{Commands, GlobalArgs};
use crate::commands::command_context::{CommandError, open_service, write_output};
use crate::commands::report_format::format_evaluation_report;
use crate::services::histogram::write_duration_histogram_png;

pub fn evaluate_command(global: &GlobalArgs, cmd: Commands) -> Result<(), CommandError> {
    if let Commands::Evaluate {
        scenario,
        horizon,
        output,
        histogram,
    } = cmd
    {
        let service = open_service(global)?;
        let evaluation = service.evaluate_scenario(&scenario, horizon)?;

        println!("{}", format_evaluation_report(&evaluation.result));
        if let Some(path) = histogram {
            write_duration_histogram_png(&path, &evaluation.duration_samples)?;
            println!("Duration histogram written to {path}");
        }
        if let Some(path) = output {
            write_output(&path, &evaluation.result)?;
        }
    }
    Ok(())
}
