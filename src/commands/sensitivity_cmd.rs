use crate::commands::base_commands::{Commands, GlobalArgs};
use crate::commands::command_context::{CommandError, open_service, write_output};
use crate::commands::report_format::format_sensitivity_report;

pub fn sensitivity_command(global: &GlobalArgs, cmd: Commands) -> Result<(), CommandError> {
    if let Commands::Sensitivity {
        scenario,
        parameters,
        variations,
        metric,
        horizon,
        output,
    } = cmd
    {
        let service = open_service(global)?;
        let report =
            service.run_sensitivity_analysis(&scenario, &parameters, &variations, metric, horizon)?;
        println!("{}", format_sensitivity_report(&report));
        if let Some(path) = output {
            write_output(&path, &report)?;
        }
    }
    Ok(())
}
