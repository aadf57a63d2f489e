//! Numeric building blocks for the forecast engine: smoothing, least-squares
//! trend fitting and autocorrelation-based seasonality detection.

use crate::services::statistics::mean;

/// Candidate seasonal periods in days (weekly, monthly, quarterly).
pub const SEASONAL_CANDIDATES: [usize; 3] = [7, 30, 90];
/// Minimum autocorrelation for a period to count as seasonal.
pub const SEASONALITY_THRESHOLD: f64 = 0.3;

/// Centered moving average. Points too close to either edge for a full
/// window keep their raw value.
pub fn centered_moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    if window < 2 || values.len() < window {
        return values.to_vec();
    }
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            if index < half || index + half >= values.len() {
                *value
            } else {
                mean(&values[index - half..=index + half])
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl LinearFit {
    pub fn value_at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Ordinary least squares of `values` against their index.
///
/// Zero variance in the values yields `r_squared = 0`; fewer than two points
/// yield a flat fit through the mean.
pub fn fit_linear_trend(values: &[f64]) -> LinearFit {
    let n = values.len();
    if n < 2 {
        return LinearFit {
            slope: 0.0,
            intercept: mean(values),
            r_squared: 0.0,
        };
    }

    let x_mean = (n as f64 - 1.0) / 2.0;
    let y_mean = mean(values);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (index, value) in values.iter().enumerate() {
        let dx = index as f64 - x_mean;
        sxy += dx * (value - y_mean);
        sxx += dx * dx;
    }
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let intercept = y_mean - slope * x_mean;

    let ss_tot: f64 = values.iter().map(|value| (value - y_mean).powi(2)).sum();
    let r_squared = if ss_tot <= f64::EPSILON {
        0.0
    } else {
        let ss_res: f64 = values
            .iter()
            .enumerate()
            .map(|(index, value)| {
                let predicted = intercept + slope * index as f64;
                (value - predicted).powi(2)
            })
            .sum();
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    };

    LinearFit {
        slope,
        intercept,
        r_squared,
    }
}

/// Sample autocorrelation at `lag`; zero when undefined.
pub fn autocorrelation(values: &[f64], lag: usize) -> f64 {
    if lag == 0 || lag >= values.len() {
        return 0.0;
    }
    let mean = mean(values);
    let denominator: f64 = values.iter().map(|value| (value - mean).powi(2)).sum();
    if denominator <= 1e-12 {
        return 0.0;
    }
    let numerator: f64 = values
        .windows(lag + 1)
        .map(|window| (window[0] - mean) * (window[lag] - mean))
        .sum();
    numerator / denominator
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeasonalPattern {
    pub period: usize,
    /// Autocorrelation at `period`.
    pub strength: f64,
    /// Peak-to-mean deviation of the phase averages.
    pub amplitude: f64,
    /// Offset within the period of the maximum phase average.
    pub phase: usize,
}

impl SeasonalPattern {
    /// Seasonal adjustment at absolute sample index `t`, peaking at `phase`.
    pub fn adjustment_at(&self, t: usize) -> f64 {
        let angle = 2.0 * std::f64::consts::PI * (t as f64 - self.phase as f64) / self.period as f64;
        self.amplitude * self.strength * angle.cos()
    }
}

/// Picks the candidate period with the highest autocorrelation above
/// [`SEASONALITY_THRESHOLD`]. A period needs more than two full cycles of data.
pub fn detect_seasonality(values: &[f64], candidates: &[usize]) -> Option<SeasonalPattern> {
    let best = candidates
        .iter()
        .copied()
        .filter(|period| *period > 1 && values.len() > period * 2)
        .map(|period| (period, autocorrelation(values, period)))
        .filter(|(_, strength)| *strength > SEASONALITY_THRESHOLD)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;

    let (period, strength) = best;
    let phase_averages = phase_averages(values, period);
    let overall = mean(&phase_averages);
    let (phase, peak) = phase_averages
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;

    Some(SeasonalPattern {
        period,
        strength,
        amplitude: peak - overall,
        phase,
    })
}

/// Average value at each offset within `period`.
pub fn phase_averages(values: &[f64], period: usize) -> Vec<f64> {
    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (index, value) in values.iter().enumerate() {
        sums[index % period] += value;
        counts[index % period] += 1;
    }
    sums.iter()
        .zip(counts)
        .map(|(sum, count)| if count == 0 { 0.0 } else { sum / count as f64 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moving_average_keeps_edges_and_smooths_interior() {
        let values = [0.0, 0.0, 0.0, 7.0, 0.0, 0.0, 0.0, 0.0];
        let smoothed = centered_moving_average(&values, 7);
        assert_eq!(smoothed.len(), values.len());
        assert_eq!(smoothed[0], 0.0);
        assert_eq!(smoothed[3], 1.0);
        assert_eq!(smoothed[4], 1.0);
        assert_eq!(smoothed[7], 0.0);
    }

    #[test]
    fn moving_average_of_a_line_is_the_same_line() {
        let values: Vec<f64> = (0..20).map(|i| 100.0 + 2.0 * i as f64).collect();
        assert_eq!(centered_moving_average(&values, 7), values);
    }

    #[test]
    fn linear_fit_recovers_slope_and_intercept() {
        let values: Vec<f64> = (0..30).map(|i| 100.0 + 2.0 * i as f64).collect();
        let fit = fit_linear_trend(&values);
        assert!((fit.slope - 2.0).abs() < 1e-9);
        assert!((fit.intercept - 100.0).abs() < 1e-9);
        assert!((fit.r_squared - 1.0).abs() < 1e-9);
    }

    #[test]
    fn linear_fit_of_constant_series_has_zero_r_squared() {
        let fit = fit_linear_trend(&[50.0; 12]);
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.intercept, 50.0);
        assert_eq!(fit.r_squared, 0.0);
    }

    #[test]
    fn autocorrelation_is_zero_for_constant_series() {
        assert_eq!(autocorrelation(&[3.0; 40], 7), 0.0);
    }

    #[test]
    fn weekly_pattern_is_detected_with_its_phase() {
        let values: Vec<f64> = (0..84)
            .map(|i| if i % 7 == 2 { 10.0 } else { 0.0 })
            .collect();
        let pattern = detect_seasonality(&values, &SEASONAL_CANDIDATES).unwrap();
        assert_eq!(pattern.period, 7);
        assert_eq!(pattern.phase, 2);
        assert!(pattern.strength > SEASONALITY_THRESHOLD);
        // phase averages are 10 at offset 2 and 0 elsewhere, mean 10/7
        assert!((pattern.amplitude - (10.0 - 10.0 / 7.0)).abs() < 1e-9);
    }

    #[test]
    fn short_series_skip_long_periods() {
        let values: Vec<f64> = (0..40).map(|i| (i % 30) as f64).collect();
        let pattern = detect_seasonality(&values, &[30, 90]);
        assert_eq!(pattern, None);
    }
}
