use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::forecast::TimeSeriesPoint;

#[derive(Error, Debug)]
pub enum TimeSeriesYamlError {
    #[error("failed to read time series {path}: {source}")]
    ReadFile { path: PathBuf, source: io::Error },
    #[error("failed to parse time series {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("time series {path} contains a non-finite value on {date}")]
    NonFiniteValue { path: PathBuf, date: chrono::NaiveDate },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TimeSeriesRecord {
    Points(Vec<TimeSeriesPoint>),
    Wrapped { points: Vec<TimeSeriesPoint> },
}

/// Reads a list of `{date, value}` points, either bare or under `points:`.
pub fn load_time_series_from_yaml_file<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<TimeSeriesPoint>, TimeSeriesYamlError> {
    let path = path.as_ref();
    let contents =
        std::fs::read_to_string(path).map_err(|source| TimeSeriesYamlError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
    let record: TimeSeriesRecord =
        serde_yaml::from_str(&contents).map_err(|source| TimeSeriesYamlError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    let points = match record {
        TimeSeriesRecord::Points(points) | TimeSeriesRecord::Wrapped { points } => points,
    };
    if let Some(point) = points.iter().find(|point| !point.value.is_finite()) {
        return Err(TimeSeriesYamlError::NonFiniteValue {
            path: path.to_path_buf(),
            date: point.date,
        });
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn reads_bare_and_wrapped_lists() {
        let temp = assert_fs::TempDir::new().unwrap();
        let bare = temp.child("bare.yaml");
        bare.write_str("- date: 2026-01-01\n  value: 3\n- date: 2026-01-02\n  value: 4.5\n")
            .unwrap();
        let wrapped = temp.child("wrapped.yaml");
        wrapped
            .write_str("points:\n  - date: 2026-01-01\n    value: 3\n")
            .unwrap();

        let points = load_time_series_from_yaml_file(bare.path()).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].value, 4.5);
        assert_eq!(load_time_series_from_yaml_file(wrapped.path()).unwrap().len(), 1);
    }

    #[test]
    fn rejects_malformed_dates() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("bad.yaml");
        file.write_str("- date: 01/02/2026\n  value: 3\n").unwrap();
        assert!(matches!(
            load_time_series_from_yaml_file(file.path()),
            Err(TimeSeriesYamlError::Parse { .. })
        ));
    }
}
