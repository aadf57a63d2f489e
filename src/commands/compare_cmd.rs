use crate::commands::base_commands::{Commands, GlobalArgs};
use crate::commands::command_context::{CommandError, open_service, save_service, write_output};
use crate::commands::report_format::format_comparison_report;

pub fn compare_command(global: &GlobalArgs, cmd: Commands) -> Result<(), CommandError> {
    if let Commands::Compare {
        scenario_a,
        scenario_b,
        output,
    } = cmd
    {
        let service = open_service(global)?;
        let comparison = service.compare_scenarios(&scenario_a, &scenario_b)?;
        // Keeps the comparison cache for the next run.
        save_service(global, &service)?;
        println!("{}", format_comparison_report(&comparison));
        if let Some(path) = output {
            write_output(&path, &comparison)?;
        }
    }
    Ok(())
}
