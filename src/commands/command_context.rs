use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::commands::base_commands::GlobalArgs;
use crate::services::engine_config_yaml::{EngineConfigYamlError, load_engine_config_if_provided};
use crate::services::forecast_engine::ForecastError;
use crate::services::histogram::HistogramError;
use crate::services::planning_service::{PlanningError, PlanningService};
use crate::services::repository::InMemoryRepository;
use crate::services::time_series_yaml::TimeSeriesYamlError;
use crate::services::workspace_yaml::{
    WorkspaceYamlError, load_workspace_from_yaml_file, save_workspace_to_yaml_file,
};

#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceYamlError),
    #[error(transparent)]
    Config(#[from] EngineConfigYamlError),
    #[error(transparent)]
    Planning(#[from] PlanningError),
    #[error(transparent)]
    TimeSeries(#[from] TimeSeriesYamlError),
    #[error(transparent)]
    Forecast(#[from] ForecastError),
    #[error(transparent)]
    Histogram(#[from] HistogramError),
    #[error("failed to serialize output: {0}")]
    Serialize(#[from] serde_yaml::Error),
    #[error("failed to serialize output: {0}")]
    SerializeJson(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    WriteOutput { path: String, source: io::Error },
    #[error("invalid date {value}, expected YYYY-MM-DD")]
    InvalidDate { value: String },
}

pub type Service = PlanningService<InMemoryRepository>;

/// Opens the workspace named on the command line with the engine config
/// applied.
pub fn open_service(global: &GlobalArgs) -> Result<Service, CommandError> {
    let mut config = load_engine_config_if_provided(global.config.as_deref())?;
    if global.seed.is_some() {
        config.seed = global.seed;
    }
    let workspace = load_workspace_from_yaml_file(&global.workspace)?;
    Ok(PlanningService::new(InMemoryRepository::new(workspace), config))
}

/// Writes the workspace back after a mutating command.
pub fn save_service(global: &GlobalArgs, service: &Service) -> Result<(), CommandError> {
    save_workspace_to_yaml_file(&global.workspace, &service.repository().snapshot())?;
    Ok(())
}

/// Writes YAML, or JSON when the path ends in `.json`.
pub fn write_output<T: Serialize>(path: &str, value: &T) -> Result<(), CommandError> {
    let contents = if path.ends_with(".json") {
        serde_json::to_string_pretty(value)?
    } else {
        serde_yaml::to_string(value)?
    };
    std::fs::write(path, contents).map_err(|source| CommandError::WriteOutput {
        path: path.to_string(),
        source,
    })?;
    println!("Result written to {path}");
    Ok(())
}

pub fn parse_date(value: &str) -> Result<chrono::NaiveDate, CommandError> {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| CommandError::InvalidDate {
        value: value.to_string(),
    })
}
