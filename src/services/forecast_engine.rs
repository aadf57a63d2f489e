use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use thiserror::Error;
use tracing::debug;

use crate::domain::allocation::Allocation;
use crate::domain::forecast::{
    ForecastMetadata, ForecastPoint, ForecastResult, TimeSeriesPoint, TrendDirection,
};
use crate::domain::time_window::{MAX_HORIZON_DAYS, TimeWindow};
use crate::services::statistics::{mean, std_dev};
use crate::services::time_series::{
    SEASONAL_CANDIDATES, SeasonalPattern, centered_moving_average, detect_seasonality,
    fit_linear_trend,
};

pub const MIN_SAMPLES: usize = 7;
pub const SMOOTHING_WINDOW: usize = 7;
pub const ALGORITHM_NAME: &str = "linear_trend_seasonal";

/// Below this share of the series mean per day, a slope counts as flat.
const STABLE_SLOPE_RATIO: f64 = 0.001;
/// Per-point confidence never starts below this.
const CONFIDENCE_FLOOR: f64 = 0.5;
/// Days over which per-point confidence decays by a factor of e.
const CONFIDENCE_DECAY_DAYS: f64 = 30.0;
const BAND_Z: f64 = 1.96;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    #[error("insufficient data: {actual} samples, at least {required} required")]
    InsufficientData { required: usize, actual: usize },
    #[error("forecast horizon must be between 1 and {} days", MAX_HORIZON_DAYS)]
    InvalidHorizon,
}

/// Decomposes `series` into trend, seasonal and residual parts and projects
/// `horizon_days` past the last observation.
pub fn forecast(
    series: &[TimeSeriesPoint],
    horizon_days: usize,
) -> Result<ForecastResult, ForecastError> {
    if series.len() < MIN_SAMPLES {
        return Err(ForecastError::InsufficientData {
            required: MIN_SAMPLES,
            actual: series.len(),
        });
    }
    if !(1..=MAX_HORIZON_DAYS).contains(&horizon_days) {
        return Err(ForecastError::InvalidHorizon);
    }

    let mut sorted = series.to_vec();
    sorted.sort_by_key(|point| point.date);
    let values: Vec<f64> = sorted.iter().map(|point| point.value).collect();
    let last_date = sorted[sorted.len() - 1].date;

    let smoothed = centered_moving_average(&values, SMOOTHING_WINDOW);
    let fit = fit_linear_trend(&smoothed);
    let residuals: Vec<f64> = values
        .iter()
        .enumerate()
        .map(|(index, value)| value - fit.value_at(index as f64))
        .collect();
    let seasonal = detect_seasonality(&residuals, &SEASONAL_CANDIDATES);
    let residual_spread = std_dev(&residuals);
    let trend = classify_trend(fit.slope, mean(&values));

    debug!(
        samples = values.len(),
        slope = fit.slope,
        r_squared = fit.r_squared,
        period = seasonal.map(|pattern| pattern.period),
        "fitted forecast model"
    );

    let last_smoothed = smoothed[smoothed.len() - 1];
    let base_confidence = fit.r_squared.max(CONFIDENCE_FLOOR);
    let mut points = Vec::with_capacity(horizon_days);
    let mut previous = values[values.len() - 1];
    for step in 1..=horizon_days {
        let t = values.len() - 1 + step;
        let predicted = project_value(last_smoothed, fit.slope, step, seasonal.as_ref(), t);
        let confidence = base_confidence * (-(step as f64) / CONFIDENCE_DECAY_DAYS).exp();
        let half_width =
            BAND_Z * residual_spread * (1.0 + step as f64 / horizon_days as f64).sqrt();
        points.push(ForecastPoint {
            date: last_date + Duration::days(step as i64),
            predicted,
            lower_bound: (predicted - half_width).max(0.0),
            upper_bound: predicted + half_width,
            confidence,
            trend: classify_step(previous, predicted),
        });
        previous = predicted;
    }

    let confidence = mean(&points.iter().map(|point| point.confidence).collect::<Vec<_>>());
    Ok(ForecastResult {
        points,
        metadata: ForecastMetadata {
            algorithm: ALGORITHM_NAME.to_string(),
            confidence,
            trend,
            has_seasonality: seasonal.is_some(),
            seasonal_period: seasonal.map(|pattern| pattern.period),
            slope: fit.slope,
            r_squared: fit.r_squared,
            sample_count: values.len(),
        },
    })
}

fn project_value(
    last_smoothed: f64,
    slope: f64,
    step: usize,
    seasonal: Option<&SeasonalPattern>,
    t: usize,
) -> f64 {
    let trend = last_smoothed + slope * step as f64;
    let adjustment = seasonal.map_or(0.0, |pattern| pattern.adjustment_at(t));
    (trend + adjustment).max(0.0)
}

fn classify_trend(slope: f64, series_mean: f64) -> TrendDirection {
    let tolerance = (series_mean.abs() * STABLE_SLOPE_RATIO).max(1e-9);
    if slope > tolerance {
        TrendDirection::Increasing
    } else if slope < -tolerance {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}

fn classify_step(previous: f64, current: f64) -> TrendDirection {
    classify_trend(current - previous, previous)
}

/// Daily allocated FTE over the `lookback_days` days ending the day before
/// `end_date`: each allocation contributes its percentage / 100 on every day
/// it is active.
pub fn history_from_allocations(
    allocations: &[Allocation],
    end_date: NaiveDate,
    lookback_days: usize,
) -> Vec<TimeSeriesPoint> {
    if lookback_days == 0 {
        return Vec::new();
    }
    let start = end_date - Duration::days(lookback_days as i64);
    let horizon = TimeWindow::from_horizon(start, lookback_days);
    let mut daily: BTreeMap<NaiveDate, f64> = horizon
        .days_within(&horizon)
        .map(|date| (date, 0.0))
        .collect();

    for allocation in allocations {
        for date in allocation.window().days_within(&horizon) {
            if let Some(total) = daily.get_mut(&date) {
                *total += allocation.allocation_percentage / 100.0;
            }
        }
    }

    daily
        .into_iter()
        .map(|(date, value)| TimeSeriesPoint { date, value })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::on_date;

    fn series_from(values: impl IntoIterator<Item = f64>) -> Vec<TimeSeriesPoint> {
        let start = on_date(2026, 1, 1);
        values
            .into_iter()
            .enumerate()
            .map(|(index, value)| TimeSeriesPoint {
                date: start + Duration::days(index as i64),
                value,
            })
            .collect()
    }

    #[test]
    fn fewer_than_seven_points_is_insufficient() {
        let series = series_from([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(
            forecast(&series, 10),
            Err(ForecastError::InsufficientData {
                required: 7,
                actual: 6
            })
        );
    }

    #[test]
    fn horizon_outside_the_supported_range_is_rejected() {
        let series = series_from((0..10).map(|i| i as f64));
        assert_eq!(forecast(&series, 0), Err(ForecastError::InvalidHorizon));
        assert_eq!(
            forecast(&series, MAX_HORIZON_DAYS + 1),
            Err(ForecastError::InvalidHorizon)
        );
        assert_eq!(forecast(&series, MAX_HORIZON_DAYS).unwrap().points.len(), MAX_HORIZON_DAYS);
    }

    #[test]
    fn increasing_linear_series_projects_a_constant_positive_slope() {
        let series = series_from((0..30).map(|i| 100.0 + 2.0 * i as f64));
        let result = forecast(&series, 14).unwrap();

        assert_eq!(result.metadata.trend, TrendDirection::Increasing);
        assert!(!result.metadata.has_seasonality);
        assert_eq!(result.metadata.sample_count, 30);
        assert_eq!(result.points.len(), 14);
        assert_eq!(result.points[0].date, on_date(2026, 1, 31));

        let predicted = result.predicted_values();
        assert!((predicted[0] - 160.0).abs() < 1e-6);
        for pair in predicted.windows(2) {
            let step = pair[1] - pair[0];
            assert!((step - 2.0).abs() < 1e-6, "step was {step}");
        }
        assert!(
            result
                .points
                .iter()
                .all(|point| point.trend == TrendDirection::Increasing)
        );
    }

    #[test]
    fn flat_series_stays_flat_with_floor_confidence() {
        let series = series_from(std::iter::repeat_n(50.0, 12));
        let result = forecast(&series, 10).unwrap();

        assert_eq!(result.metadata.trend, TrendDirection::Stable);
        assert_eq!(result.metadata.r_squared, 0.0);
        for (index, point) in result.points.iter().enumerate() {
            assert!((point.predicted - 50.0).abs() < 1e-9);
            assert_eq!(point.trend, TrendDirection::Stable);
            let expected = 0.5 * (-((index + 1) as f64) / 30.0).exp();
            assert!((point.confidence - expected).abs() < 1e-12);
            assert_eq!(point.lower_bound, 50.0);
            assert_eq!(point.upper_bound, 50.0);
        }
    }

    #[test]
    fn unsorted_input_is_sorted_before_fitting() {
        let mut series = series_from((0..10).map(|i| 10.0 + i as f64));
        series.reverse();
        let result = forecast(&series, 3).unwrap();
        assert_eq!(result.points[0].date, on_date(2026, 1, 11));
        assert_eq!(result.metadata.trend, TrendDirection::Increasing);
    }

    #[test]
    fn confidence_decays_with_distance() {
        let series = series_from((0..30).map(|i| 10.0 + i as f64));
        let result = forecast(&series, 60).unwrap();
        let first = result.points.first().unwrap().confidence;
        let last = result.points.last().unwrap().confidence;
        assert!(first > last);
        assert!(result.metadata.confidence < first);
        assert!(result.metadata.confidence > last);
    }

    #[test]
    fn decreasing_series_never_projects_below_zero() {
        let series = series_from((0..10).map(|i| 20.0 - 2.0 * i as f64));
        let result = forecast(&series, 30).unwrap();
        assert_eq!(result.metadata.trend, TrendDirection::Decreasing);
        assert!(result.points.iter().all(|point| point.predicted >= 0.0));
        assert_eq!(result.points.last().unwrap().predicted, 0.0);
    }

    #[test]
    fn weekly_seasonality_shapes_the_projection() {
        let series = series_from((0..70).map(|i| if i % 7 == 0 { 30.0 } else { 10.0 }));
        let result = forecast(&series, 14).unwrap();
        assert!(result.metadata.has_seasonality);
        assert_eq!(result.metadata.seasonal_period, Some(7));

        let predicted = result.predicted_values();
        let peak = predicted
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let trough = predicted.iter().copied().fold(f64::INFINITY, f64::min);
        assert!(peak - trough > 1.0);
    }

    #[test]
    fn history_sums_active_allocations_per_day() {
        let allocations = vec![
            Allocation {
                employee_id: "E1".to_string(),
                project_id: "P1".to_string(),
                start_date: on_date(2026, 1, 1),
                end_date: None,
                allocation_percentage: 50.0,
                hourly_rate: None,
            },
            Allocation {
                employee_id: "E2".to_string(),
                project_id: "P1".to_string(),
                start_date: on_date(2026, 1, 5),
                end_date: Some(on_date(2026, 1, 6)),
                allocation_percentage: 100.0,
                hourly_rate: None,
            },
        ];
        let history = history_from_allocations(&allocations, on_date(2026, 1, 8), 7);

        assert_eq!(history.len(), 7);
        assert_eq!(history[0].date, on_date(2026, 1, 1));
        assert_eq!(history[6].date, on_date(2026, 1, 7));
        let values: Vec<f64> = history.iter().map(|point| point.value).collect();
        assert_eq!(values, vec![0.5, 0.5, 0.5, 0.5, 1.5, 1.5, 0.5]);
    }
}
