pub mod allocate_cmd;
pub mod base_commands;
pub mod command_context;
pub mod compare_cmd;
pub mod conflicts_cmd;
pub mod duplicate_cmd;
pub mod evaluate_cmd;
pub mod forecast_cmd;
pub mod optimize_cmd;
pub mod report_format;
pub mod sensitivity_cmd;
pub mod skill_gaps_cmd;
