use crate::commands::base_commands::{Commands, GlobalArgs};
use crate::commands::command_context::{CommandError, open_service, write_output};
use crate::commands::report_format::format_skill_gap_report;

pub fn skill_gaps_command(global: &GlobalArgs, cmd: Commands) -> Result<(), CommandError> {
    if let Commands::SkillGaps { scenario, output } = cmd {
        let service = open_service(global)?;
        let gaps = service.analyze_skill_gaps(&scenario)?;
        println!("{}", format_skill_gap_report(&scenario, &gaps));
        if let Some(path) = output {
            write_output(&path, &gaps)?;
        }
    }
    Ok(())
}
