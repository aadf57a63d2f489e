use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("parameter {id}: value {value} is outside [{min}, {max}]")]
    OutOfRange {
        id: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("parameter {id}: value {value} is not one of the allowed values")]
    NotAllowed { id: String, value: String },
    #[error("parameter {id}: {kind} expects a {expected} value")]
    TypeMismatch {
        id: String,
        kind: &'static str,
        expected: &'static str,
    },
}

/// What a parameter controls when a scenario is evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParameterKind {
    /// Scales every project's team size.
    TeamSizeMultiplier,
    /// Extends every project's duration by the given percentage.
    TimelineBuffer,
    /// Overrides the declared budget used for cost variance.
    BudgetCeiling,
    /// Overrides one project's probability of going ahead.
    ProjectProbability { project_id: String },
    /// Forces one project in or out of the scenario.
    ProjectInclusion { project_id: String },
    /// Carried along for the planner, ignored by the engine.
    Custom,
}

impl ParameterKind {
    pub fn name(&self) -> &'static str {
        match self {
            ParameterKind::TeamSizeMultiplier => "team_size_multiplier",
            ParameterKind::TimelineBuffer => "timeline_buffer",
            ParameterKind::BudgetCeiling => "budget_ceiling",
            ParameterKind::ProjectProbability { .. } => "project_probability",
            ParameterKind::ProjectInclusion { .. } => "project_inclusion",
            ParameterKind::Custom => "custom",
        }
    }
}

/// Typed parameter payload. Percentages are expressed in percent (0-100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParameterValue {
    Number(f64),
    Percentage(f64),
    Date(NaiveDate),
    Boolean(bool),
    Enumeration(String),
}

impl ParameterValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterValue::Number(_) => "number",
            ParameterValue::Percentage(_) => "percentage",
            ParameterValue::Date(_) => "date",
            ParameterValue::Boolean(_) => "boolean",
            ParameterValue::Enumeration(_) => "enumeration",
        }
    }

    /// Numeric view of numbers and percentages.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Number(value) | ParameterValue::Percentage(value) => Some(*value),
            _ => None,
        }
    }

    /// A percentage as a fraction; plain numbers are taken as fractions already.
    pub fn as_fraction(&self) -> Option<f64> {
        match self {
            ParameterValue::Percentage(value) => Some(value / 100.0),
            ParameterValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// Same variant with a new numeric payload. Non-numeric values are returned unchanged.
    pub fn with_numeric(&self, value: f64) -> ParameterValue {
        match self {
            ParameterValue::Number(_) => ParameterValue::Number(value),
            ParameterValue::Percentage(_) => ParameterValue::Percentage(value),
            other => other.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParameter {
    pub id: String,
    #[serde(flatten)]
    pub kind: ParameterKind,
    pub value: ParameterValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
    #[serde(default)]
    pub description: String,
}

impl ScenarioParameter {
    pub fn new(id: &str, kind: ParameterKind, value: ParameterValue) -> Self {
        Self {
            id: id.to_string(),
            kind,
            value,
            min: None,
            max: None,
            allowed_values: None,
            description: String::new(),
        }
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Whether the optimizer may change this parameter.
    pub fn is_tunable(&self) -> bool {
        if matches!(self.kind, ParameterKind::Custom) {
            return false;
        }
        match &self.value {
            ParameterValue::Number(_) | ParameterValue::Percentage(_) => true,
            ParameterValue::Boolean(_) => true,
            ParameterValue::Enumeration(_) => self
                .allowed_values
                .as_ref()
                .is_some_and(|values| values.len() > 1),
            ParameterValue::Date(_) => false,
        }
    }

    /// Declared numeric bounds, falling back to defaults for the parameter kind.
    pub fn numeric_range(&self) -> Option<(f64, f64)> {
        let current = self.value.as_f64()?;
        let (default_min, default_max) = match (&self.kind, &self.value) {
            (ParameterKind::TeamSizeMultiplier, _) => (0.5, 2.0),
            (ParameterKind::TimelineBuffer, ParameterValue::Percentage(_)) => (0.0, 50.0),
            (ParameterKind::TimelineBuffer, _) => (0.0, 0.5),
            (ParameterKind::ProjectProbability { .. }, ParameterValue::Percentage(_)) => {
                (0.0, 100.0)
            }
            (ParameterKind::ProjectProbability { .. }, _) => (0.0, 1.0),
            (_, ParameterValue::Percentage(_)) => (0.0, 100.0),
            _ => {
                let spread = current.abs().max(1.0) * 0.5;
                (current - spread, current + spread)
            }
        };
        let min = self.min.unwrap_or(default_min);
        let max = self.max.unwrap_or(default_max);
        Some((min.min(max), max.max(min)))
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        self.check_kind_compatibility()?;

        if let Some(value) = self.value.as_f64() {
            let (min, max) = match (self.min, self.max) {
                (None, None) => return Ok(()),
                _ => self.numeric_range().unwrap_or((f64::MIN, f64::MAX)),
            };
            if value < min || value > max {
                return Err(ParameterError::OutOfRange {
                    id: self.id.clone(),
                    value,
                    min,
                    max,
                });
            }
        }

        if let (ParameterValue::Enumeration(value), Some(allowed)) =
            (&self.value, self.allowed_values.as_ref())
        {
            if !allowed.contains(value) {
                return Err(ParameterError::NotAllowed {
                    id: self.id.clone(),
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_kind_compatibility(&self) -> Result<(), ParameterError> {
        let expected = match self.kind {
            ParameterKind::TeamSizeMultiplier
            | ParameterKind::TimelineBuffer
            | ParameterKind::BudgetCeiling
            | ParameterKind::ProjectProbability { .. } => {
                if self.value.as_f64().is_some() {
                    return Ok(());
                }
                "numeric"
            }
            ParameterKind::ProjectInclusion { .. } => {
                if self.value.as_bool().is_some() {
                    return Ok(());
                }
                "boolean"
            }
            ParameterKind::Custom => return Ok(()),
        };
        Err(ParameterError::TypeMismatch {
            id: self.id.clone(),
            kind: self.kind.name(),
            expected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_parameters_deserialize_from_tagged_yaml() {
        let yaml = r#"
id: buffer
kind: timeline_buffer
value:
  type: percentage
  value: 15
min: 0
max: 40
description: extra schedule slack
"#;
        let parameter: ScenarioParameter = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parameter.kind, ParameterKind::TimelineBuffer);
        assert_eq!(parameter.value, ParameterValue::Percentage(15.0));
        assert_eq!(parameter.value.as_fraction(), Some(0.15));
        assert_eq!(parameter.numeric_range(), Some((0.0, 40.0)));
    }

    #[test]
    fn project_probability_carries_its_project_id() {
        let yaml = r#"
id: p1-probability
kind: project_probability
project_id: P1
value:
  type: number
  value: 0.7
"#;
        let parameter: ScenarioParameter = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            parameter.kind,
            ParameterKind::ProjectProbability {
                project_id: "P1".to_string()
            }
        );
        assert_eq!(parameter.numeric_range(), Some((0.0, 1.0)));
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let parameter = ScenarioParameter::new(
            "team",
            ParameterKind::TeamSizeMultiplier,
            ParameterValue::Number(3.0),
        )
        .with_range(0.5, 2.0);
        assert!(matches!(
            parameter.validate(),
            Err(ParameterError::OutOfRange { .. })
        ));
    }

    #[test]
    fn validate_rejects_boolean_for_numeric_kinds() {
        let parameter = ScenarioParameter::new(
            "team",
            ParameterKind::TeamSizeMultiplier,
            ParameterValue::Boolean(true),
        );
        assert!(matches!(
            parameter.validate(),
            Err(ParameterError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn dates_and_custom_parameters_are_not_tunable() {
        let date = ScenarioParameter::new(
            "kickoff",
            ParameterKind::Custom,
            ParameterValue::Date(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()),
        );
        assert!(!date.is_tunable());

        let inclusion = ScenarioParameter::new(
            "include-p1",
            ParameterKind::ProjectInclusion {
                project_id: "P1".to_string(),
            },
            ParameterValue::Boolean(true),
        );
        assert!(inclusion.is_tunable());
    }
}
