use crate::commands::base_commands::Commands;
use crate::commands::command_context::{CommandError, write_output};
use crate::commands::report_format::format_forecast_report;
use crate::services::forecast_engine::forecast;
use crate::services::time_series_yaml::load_time_series_from_yaml_file;

/// Needs no workspace: the series comes from its own file.
pub fn forecast_command(cmd: Commands) -> Result<(), CommandError> {
    if let Commands::Forecast {
        input,
        horizon,
        output,
    } = cmd
    {
        let series = load_time_series_from_yaml_file(&input)?;
        let result = forecast(&series, horizon)?;
        println!("{}", format_forecast_report(&result));
        if let Some(path) = output {
            write_output(&path, &result)?;
        }
    }
    Ok(())
}
