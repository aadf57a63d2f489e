use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::time_window::MAX_HORIZON_DAYS;

#[derive(Error, Debug)]
pub enum EngineConfigYamlError {
    #[error("failed to read engine config {path}: {source}")]
    ReadFile { path: PathBuf, source: io::Error },
    #[error("failed to parse engine config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid engine config: {0}")]
    Invalid(String),
}

/// Tunables of the planning engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Baseline staffing capacity in FTE.
    pub total_capacity: f64,
    /// Baseline capacity per skill in FTE.
    pub skill_capacity: BTreeMap<String, f64>,
    /// Cost of one FTE-day.
    pub daily_rate: f64,
    pub hours_per_day: f64,
    pub monte_carlo_iterations: usize,
    /// Projects below this probability are left out of demand.
    pub inclusion_threshold: f64,
    /// Days of committed allocations fed to the capacity forecast.
    pub history_lookback_days: usize,
    pub comparison_ttl_hours: i64,
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            total_capacity: 20.0,
            skill_capacity: BTreeMap::new(),
            daily_rate: 800.0,
            hours_per_day: 8.0,
            monte_carlo_iterations: 1000,
            inclusion_threshold: 0.5,
            history_lookback_days: 90,
            comparison_ttl_hours: 24,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineConfigYamlError> {
        if !(self.total_capacity > 0.0) {
            return Err(EngineConfigYamlError::Invalid(
                "total_capacity must be greater than zero".to_string(),
            ));
        }
        if let Some((skill, capacity)) = self
            .skill_capacity
            .iter()
            .find(|(_, capacity)| !(**capacity >= 0.0))
        {
            return Err(EngineConfigYamlError::Invalid(format!(
                "capacity for skill {skill} must not be negative (got {capacity})"
            )));
        }
        if self.daily_rate < 0.0 || self.hours_per_day <= 0.0 {
            return Err(EngineConfigYamlError::Invalid(
                "daily_rate must not be negative and hours_per_day must be positive".to_string(),
            ));
        }
        if self.monte_carlo_iterations == 0 {
            return Err(EngineConfigYamlError::Invalid(
                "monte_carlo_iterations must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.inclusion_threshold) {
            return Err(EngineConfigYamlError::Invalid(
                "inclusion_threshold must be within 0-1".to_string(),
            ));
        }
        if self.comparison_ttl_hours <= 0 || self.comparison_ttl_hours > MAX_HORIZON_DAYS as i64 * 24 {
            return Err(EngineConfigYamlError::Invalid(format!(
                "comparison_ttl_hours must be between 1 and {}",
                MAX_HORIZON_DAYS * 24
            )));
        }
        if self.history_lookback_days > MAX_HORIZON_DAYS {
            return Err(EngineConfigYamlError::Invalid(format!(
                "history_lookback_days must not exceed {MAX_HORIZON_DAYS}"
            )));
        }
        Ok(())
    }
}

pub fn load_engine_config_from_yaml_file<P: AsRef<Path>>(
    path: P,
) -> Result<EngineConfig, EngineConfigYamlError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| {
        EngineConfigYamlError::ReadFile {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let config: EngineConfig =
        serde_yaml::from_str(&contents).map_err(|source| EngineConfigYamlError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}

/// The config at `path` when given, the defaults otherwise.
pub fn load_engine_config_if_provided(
    path: Option<&str>,
) -> Result<EngineConfig, EngineConfigYamlError> {
    match path {
        Some(path) => load_engine_config_from_yaml_file(path),
        None => Ok(EngineConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: EngineConfig = serde_yaml::from_str(
            "total_capacity: 12\nskill_capacity:\n  rust: 4\n  design: 1.5\n",
        )
        .unwrap();
        assert_eq!(config.total_capacity, 12.0);
        assert_eq!(config.skill_capacity["design"], 1.5);
        assert_eq!(config.monte_carlo_iterations, 1000);
        assert_eq!(config.seed, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_nonsense() {
        let mut config = EngineConfig::default();
        config.inclusion_threshold = 1.5;
        assert!(matches!(config.validate(), Err(EngineConfigYamlError::Invalid(_))));

        let mut config = EngineConfig::default();
        config.skill_capacity.insert("rust".to_string(), -1.0);
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.monte_carlo_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.history_lookback_days = MAX_HORIZON_DAYS + 1;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.comparison_ttl_hours = i64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn no_path_means_defaults() {
        assert_eq!(
            load_engine_config_if_provided(None).unwrap(),
            EngineConfig::default()
        );
    }
}
