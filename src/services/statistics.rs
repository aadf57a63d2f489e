use serde::Serialize;

/// Summary statistics and percentile helpers.
///
/// - Empty input => neutral zeros, never NaN.
/// - Percentiles work on already-sorted slices: `percentile <= 0` is the first
///   element, `percentile >= 100` the last, anything else rounds a position
///   within `[0, len-1]` to the nearest index.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean(values);
    values.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / values.len() as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Returns the percentile value from a slice sorted in ascending order.
pub fn value_sorted<T: Copy>(sorted_values: &[T], percentile: f64) -> Option<T> {
    if sorted_values.is_empty() {
        return None;
    }

    let index = if percentile <= 0.0 {
        0
    } else if percentile >= 100.0 {
        sorted_values.len() - 1
    } else {
        let position = (percentile / 100.0) * (sorted_values.len() as f64 - 1.0);
        position.round() as usize
    };

    sorted_values.get(index).copied()
}

pub fn percentile_f64(sorted_values: &[f64], percentile: f64) -> f64 {
    value_sorted(sorted_values, percentile).unwrap_or(0.0)
}

pub fn sort_f64(values: &mut [f64]) {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct DistributionSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub p50: f64,
    pub p85: f64,
}

impl DistributionSummary {
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let mut sorted = samples.to_vec();
        sort_f64(&mut sorted);
        Self {
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean: mean(&sorted),
            std_dev: std_dev(&sorted),
            p50: percentile_f64(&sorted, 50.0),
            p85: percentile_f64(&sorted, 85.0),
        }
    }

    /// Coefficient of variation, zero when the mean is zero.
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean.abs() < f64::EPSILON {
            0.0
        } else {
            self.std_dev / self.mean.abs()
        }
    }
}
