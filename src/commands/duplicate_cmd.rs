use crate::commands::base_commands::{Commands, GlobalArgs};
use crate::commands::command_context::{CommandError, open_service, save_service};

pub fn duplicate_command(global: &GlobalArgs, cmd: Commands) -> Result<(), CommandError> {
    if let Commands::Duplicate { scenario, name } = cmd {
        let service = open_service(global)?;
        let copy = service.duplicate_scenario(&scenario, &name)?;
        save_service(global, &service)?;
        println!("Scenario {scenario} duplicated as {} ({name})", copy.id);
    }
    Ok(())
}
