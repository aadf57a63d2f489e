use crate::commands::base_commands::{Commands, GlobalArgs};
use crate::commands::command_context::{CommandError, open_service, write_output};
use crate::commands::report_format::format_conflict_report;

pub fn conflicts_command(global: &GlobalArgs, cmd: Commands) -> Result<(), CommandError> {
    if let Commands::Conflicts { scenario, output } = cmd {
        let service = open_service(global)?;
        let report = service.detect_resource_conflicts(&scenario)?;
        println!("{}", format_conflict_report(&report));
        if let Some(path) = output {
            write_output(&path, &report)?;
        }
    }
    Ok(())
}
