//! The validated lambda discretization.

use super::naming::{self, ArtifactKind};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("lambda schedule must contain at least two values, got {0}")]
    TooShort(usize),

    #[error("lambda schedule must start at 0.0 exactly, got {0}")]
    BadStart(f64),

    #[error("lambda schedule must end at 1.0 exactly, got {0}")]
    BadEnd(f64),

    #[error("lambda schedule must be non-decreasing: value {next} at index {index} follows {prev}")]
    NotSorted { index: usize, prev: f64, next: f64 },

    #[error("lambda schedule contains non-finite value {value} at index {index}")]
    NonFinite { index: usize, value: f64 },

    #[error("failed to read schedule file '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid lambda value '{value}' in schedule file '{path}'", path = path.display())]
    Parse { path: PathBuf, value: String },

    #[error("no per-lambda input files for stage '{stage}' found in '{dir}'", dir = dir.display())]
    NoLambdaFiles { stage: String, dir: PathBuf },
}

/// An ordered, immutable sequence of coupling values in `[0.0, 1.0]`.
///
/// Invariants, enforced at construction and never revisited:
/// - length >= 2,
/// - every value is finite,
/// - the first value is exactly `0.0` and the last exactly `1.0` (the two
///   physical endpoints),
/// - values are non-decreasing.
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaSchedule {
    values: Vec<f64>,
}

impl LambdaSchedule {
    /// Validates and wraps a caller-supplied sequence of coupling values.
    pub fn new(values: Vec<f64>) -> Result<Self, ScheduleError> {
        if values.len() < 2 {
            return Err(ScheduleError::TooShort(values.len()));
        }
        // NaN compares false against everything, so it would sail past the
        // ordering and endpoint checks below and end up in filenames.
        for (index, &value) in values.iter().enumerate() {
            if !value.is_finite() {
                return Err(ScheduleError::NonFinite { index, value });
            }
        }
        let first = values[0];
        if first != 0.0 {
            return Err(ScheduleError::BadStart(first));
        }
        let last = values[values.len() - 1];
        if last != 1.0 {
            return Err(ScheduleError::BadEnd(last));
        }
        for (index, pair) in values.windows(2).enumerate() {
            if pair[1] < pair[0] {
                return Err(ScheduleError::NotSorted {
                    index: index + 1,
                    prev: pair[0],
                    next: pair[1],
                });
            }
        }
        Ok(Self { values })
    }

    /// Reads a whitespace/newline-separated schedule file.
    pub fn from_file(path: &Path) -> Result<Self, ScheduleError> {
        let text = std::fs::read_to_string(path).map_err(|source| ScheduleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut values = Vec::new();
        for word in text.split_whitespace() {
            let value: f64 = word.parse().map_err(|_| ScheduleError::Parse {
                path: path.to_path_buf(),
                value: word.to_string(),
            })?;
            values.push(value);
        }
        Self::new(values)
    }

    /// Infers the schedule from the per-lambda input files a reference tree
    /// already contains for one lambda-resolved stage.
    pub fn infer_from_inputs(dir: &Path, stage: &str) -> Result<Self, ScheduleError> {
        let entries = std::fs::read_dir(dir).map_err(|source| ScheduleError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut values: Vec<f64> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ScheduleError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(token) = naming::parse_artifact_name(name, stage, ArtifactKind::Input) else {
                continue;
            };
            if let Ok(value) = token.parse::<f64>() {
                values.push(value);
            }
        }
        if values.is_empty() {
            return Err(ScheduleError::NoLambdaFiles {
                stage: stage.to_string(),
                dir: dir.to_path_buf(),
            });
        }
        values.sort_by(f64::total_cmp);
        values.dedup();
        Self::new(values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        false // length >= 2 by construction
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// All values except the two physical endpoints.
    pub fn interior(&self) -> &[f64] {
        &self.values[1..self.values.len() - 1]
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn accepts_a_well_formed_schedule() {
        let schedule = LambdaSchedule::new(vec![0.0, 0.25, 0.5, 0.75, 1.0]).unwrap();
        assert_eq!(schedule.len(), 5);
        assert_eq!(schedule.interior(), &[0.25, 0.5, 0.75]);
    }

    #[test]
    fn accepts_the_minimal_endpoint_pair() {
        let schedule = LambdaSchedule::new(vec![0.0, 1.0]).unwrap();
        assert_eq!(schedule.len(), 2);
        assert!(schedule.interior().is_empty());
    }

    #[test]
    fn rejects_fewer_than_two_values() {
        assert!(matches!(
            LambdaSchedule::new(vec![0.0]),
            Err(ScheduleError::TooShort(1))
        ));
    }

    #[test]
    fn rejects_inexact_endpoints() {
        assert!(matches!(
            LambdaSchedule::new(vec![0.001, 0.5, 1.0]),
            Err(ScheduleError::BadStart(_))
        ));
        assert!(matches!(
            LambdaSchedule::new(vec![0.0, 0.5, 0.999]),
            Err(ScheduleError::BadEnd(_))
        ));
    }

    #[test]
    fn rejects_non_finite_values() {
        assert!(matches!(
            LambdaSchedule::new(vec![0.0, f64::NAN, 1.0]),
            Err(ScheduleError::NonFinite { index: 1, .. })
        ));
        assert!(matches!(
            LambdaSchedule::new(vec![0.0, f64::INFINITY, 1.0]),
            Err(ScheduleError::NonFinite { index: 1, .. })
        ));
        assert!(matches!(
            LambdaSchedule::new(vec![f64::NEG_INFINITY, 0.5, 1.0]),
            Err(ScheduleError::NonFinite { index: 0, .. })
        ));
    }

    #[test]
    fn rejects_decreasing_values() {
        assert!(matches!(
            LambdaSchedule::new(vec![0.0, 0.6, 0.4, 1.0]),
            Err(ScheduleError::NotSorted { index: 2, .. })
        ));
    }

    #[test]
    fn reads_a_whitespace_separated_schedule_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edge_ar_16.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "0.0 0.2\n0.8\t1.0").unwrap();

        let schedule = LambdaSchedule::from_file(&path).unwrap();
        assert_eq!(schedule.values(), &[0.0, 0.2, 0.8, 1.0]);
    }

    #[test]
    fn reports_unparseable_schedule_file_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        std::fs::write(&path, "0.0 mid 1.0").unwrap();

        assert!(matches!(
            LambdaSchedule::from_file(&path),
            Err(ScheduleError::Parse { value, .. }) if value == "mid"
        ));
    }

    #[test]
    fn infers_the_schedule_from_reference_input_files() {
        let dir = tempfile::tempdir().unwrap();
        for token in ["0.00000000", "0.50000000", "1.00000000"] {
            std::fs::write(dir.path().join(format!("{token}_ti.mdin")), "").unwrap();
        }
        // Files for other stages and kinds must not contribute.
        std::fs::write(dir.path().join("0.25000000_preTI.mdin"), "").unwrap();
        std::fs::write(dir.path().join("0.75000000_ti.rst7"), "").unwrap();

        let schedule = LambdaSchedule::infer_from_inputs(dir.path(), "ti").unwrap();
        assert_eq!(schedule.values(), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn inference_fails_when_no_stage_files_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            LambdaSchedule::infer_from_inputs(dir.path(), "ti"),
            Err(ScheduleError::NoLambdaFiles { .. })
        ));
    }
}
