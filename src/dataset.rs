use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::errors::{FxVideoError, Result};

const MARGIN_RATIO: f64 = 0.1;

/// Ground-truth samples of a one-variable function.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

/// Axis limits of a rendered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl PlotBounds {
    /// Whether a point lies on the visible plot; non-finite points never do.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (self.x_min..=self.x_max).contains(&x) && (self.y_min..=self.y_max).contains(&y)
    }
}

impl Dataset {
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let (xs, ys) = points.into_iter().unzip();
        Self { xs, ys }
    }

    /// Reads a headerless CSV whose first two columns are x and y.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| FxVideoError::FileSystem {
            path: path.to_path_buf(),
            operation: "dataset open".to_string(),
            source: e,
        })?;

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(file);

        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| with_path(e.into(), path))?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            let line = record.position().map_or(0, |p| p.line());
            xs.push(parse_field(&record, 0, path, line)?);
            ys.push(parse_field(&record, 1, path, line)?);
        }

        if xs.is_empty() {
            return Err(FxVideoError::Dataset {
                path: path.to_path_buf(),
                line: 0,
                reason: "no samples".to_string(),
            });
        }

        tracing::debug!(path = %path.display(), samples = xs.len(), "dataset loaded");
        Ok(Self { xs, ys })
    }

    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.xs.iter().copied().zip(self.ys.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Data extremes widened by 10% of the span on each side.
    pub fn bounds(&self) -> PlotBounds {
        let (x_min, x_max) = padded_range(&self.xs);
        let (y_min, y_max) = padded_range(&self.ys);
        PlotBounds {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }
}

fn padded_range(values: &[f64]) -> (f64, f64) {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() {
        return (-0.5, 0.5);
    }
    let span = max - min;
    if span == 0.0 {
        return (min - 0.5, max + 0.5);
    }
    (min - MARGIN_RATIO * span, max + MARGIN_RATIO * span)
}

fn parse_field(record: &StringRecord, index: usize, path: &Path, line: u64) -> Result<f64> {
    let dataset_error = |reason: String| FxVideoError::Dataset {
        path: path.to_path_buf(),
        line,
        reason,
    };
    let field = record
        .get(index)
        .ok_or_else(|| dataset_error(format!("missing column {}", index + 1)))?;
    let value: f64 = field
        .parse()
        .map_err(|_| dataset_error(format!("column {} is not a number: {:?}", index + 1, field)))?;
    if !value.is_finite() {
        return Err(dataset_error(format!(
            "column {} is not finite: {}",
            index + 1,
            field
        )));
    }
    Ok(value)
}

fn with_path(err: FxVideoError, path: &Path) -> FxVideoError {
    match err {
        FxVideoError::Dataset { line, reason, .. } => FxVideoError::Dataset {
            path: PathBuf::from(path),
            line,
            reason,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("data.csv");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_parses_two_columns() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_csv(&dir, "0.0,1.0\n1.5, -2.0\n\n3,4,ignored\n");

        let dataset = Dataset::from_csv(&path)?;
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.xs(), &[0.0, 1.5, 3.0]);
        assert_eq!(dataset.ys(), &[1.0, -2.0, 4.0]);
        Ok(())
    }

    #[test]
    fn test_rejects_non_numeric_row() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "0.0,1.0\nx,y\n");

        match Dataset::from_csv(&path) {
            Err(FxVideoError::Dataset { line, path: p, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(p, path);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_missing_column_and_nan() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "1.0\n");
        assert!(matches!(
            Dataset::from_csv(&path),
            Err(FxVideoError::Dataset { .. })
        ));

        let path = write_csv(&dir, "1.0,NaN\n");
        assert!(matches!(
            Dataset::from_csv(&path),
            Err(FxVideoError::Dataset { .. })
        ));
    }

    #[test]
    fn test_empty_and_missing_files() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "");
        assert!(Dataset::from_csv(&path).is_err());

        let missing = dir.path().join("missing.csv");
        assert!(matches!(
            Dataset::from_csv(&missing),
            Err(FxVideoError::FileSystem { .. })
        ));
    }

    #[test]
    fn test_bounds_have_ten_percent_margin() {
        let dataset = Dataset::from_points([(0.0, -1.0), (10.0, 1.0), (5.0, 0.0)]);
        let bounds = dataset.bounds();
        assert!((bounds.x_min - -1.0).abs() < 1e-12);
        assert!((bounds.x_max - 11.0).abs() < 1e-12);
        assert!((bounds.y_min - -1.2).abs() < 1e-12);
        assert!((bounds.y_max - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_bounds_contains() {
        let bounds = Dataset::from_points([(0.0, 0.0), (10.0, 10.0)]).bounds();
        assert!(bounds.contains(-1.0, 11.0));
        assert!(!bounds.contains(-1.5, 5.0));
        assert!(!bounds.contains(5.0, f64::NAN));
        assert!(!bounds.contains(f64::INFINITY, 5.0));
    }

    #[test]
    fn test_bounds_of_constant_values_are_not_empty() {
        let dataset = Dataset::from_points([(2.0, 3.0), (2.0, 3.0)]);
        let bounds = dataset.bounds();
        assert_eq!((bounds.x_min, bounds.x_max), (1.5, 2.5));
        assert_eq!((bounds.y_min, bounds.y_max), (2.5, 3.5));
    }
}
