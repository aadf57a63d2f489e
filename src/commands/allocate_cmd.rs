use crate::commands::base_commands::{Commands, GlobalArgs};
use crate::commands::command_context::{CommandError, open_service, parse_date, save_service};
use crate::services::planning_service::AllocationDraft;

pub fn allocate_command(global: &GlobalArgs, cmd: Commands) -> Result<(), CommandError> {
    if let Commands::Allocate {
        scenario,
        employee,
        project,
        percentage,
        start_date,
        end_date,
        hourly_rate,
        allocation_type,
    } = cmd
    {
        let mut draft = AllocationDraft::new(&employee, &project, percentage, parse_date(&start_date)?);
        if let Some(end_date) = end_date {
            draft = draft.until(parse_date(&end_date)?);
        }
        draft.hourly_rate = hourly_rate;
        draft.allocation_type = allocation_type;

        let service = open_service(global)?;
        let allocation = service.create_scenario_allocation(&scenario, draft)?;
        save_service(global, &service)?;
        println!(
            "Allocated {employee} to {project} at {percentage}% in scenario {scenario} ({})",
            allocation.id
        );
    }
    Ok(())
}
