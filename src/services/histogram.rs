use std::collections::BTreeMap;
use std::path::Path;

use plotters::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistogramError {
    #[error("failed to render histogram: {0}")]
    Render(String),
}

/// Renders simulated portfolio durations as a PNG histogram. Nothing is
/// written for an empty sample set.
pub fn write_duration_histogram_png<P: AsRef<Path>>(
    output_path: P,
    durations: &[f64],
) -> Result<(), HistogramError> {
    let samples: Vec<f64> = durations.iter().copied().filter(|v| v.is_finite()).collect();
    if samples.is_empty() {
        return Ok(());
    }

    let min_value = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max_value = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max_value - min_value;
    // Square-root rule, with a one-day floor so identical samples still bin.
    let bin_width = (range / (samples.len() as f64).sqrt()).max(1.0);

    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for value in &samples {
        let bucket = (value / bin_width).floor() as i64;
        *counts.entry(bucket).or_insert(0) += 1;
    }
    let max_count = counts.values().copied().max().unwrap_or(1);
    let min_bucket = counts.keys().next().copied().unwrap_or(0);
    let max_bucket = counts.keys().next_back().copied().unwrap_or(0) + 1;

    let root = BitMapBackend::new(output_path.as_ref(), (800, 600)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| HistogramError::Render(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption("Portfolio duration risk", ("sans-serif", 30))
        .x_label_area_size(55)
        .y_label_area_size(65)
        .build_cartesian_2d(min_bucket..max_bucket, 0..(max_count + 1))
        .map_err(|e| HistogramError::Render(e.to_string()))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Simulated duration (days)")
        .y_desc("Frequency")
        .label_style(("sans-serif", 18))
        .axis_desc_style(("sans-serif", 22))
        .x_label_formatter(&|bucket| format!("{:.0}", *bucket as f64 * bin_width))
        .draw()
        .map_err(|e| HistogramError::Render(e.to_string()))?;

    let bar_style = ShapeStyle::from(&RGBColor(30, 122, 204)).filled();
    chart
        .draw_series(
            counts
                .iter()
                .map(|(bucket, count)| Rectangle::new([(*bucket, 0), (*bucket + 1, *count)], bar_style)),
        )
        .map_err(|e| HistogramError::Render(e.to_string()))?;

    root.present()
        .map_err(|e| HistogramError::Render(e.to_string()))?;
    Ok(())
}
