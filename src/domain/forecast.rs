use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
            TrendDirection::Stable => "stable",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub confidence: f64,
    pub trend: TrendDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastMetadata {
    pub algorithm: String,
    pub confidence: f64,
    pub trend: TrendDirection,
    pub has_seasonality: bool,
    pub seasonal_period: Option<usize>,
    pub slope: f64,
    pub r_squared: f64,
    pub sample_count: usize,
}

/// Recomputed on every run, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    pub points: Vec<ForecastPoint>,
    pub metadata: ForecastMetadata,
}

impl ForecastResult {
    pub fn predicted_values(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.predicted).collect()
    }
}
