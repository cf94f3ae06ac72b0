//! Feature Matrix
//!
//! Rows are records, columns follow `FEATURE_LAYOUT`.

use ndarray::{Array2, ArrayView1};

use super::layout::FEATURE_COUNT;
use crate::logic::error::ShapeError;
use crate::logic::telemetry::TelemetryRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    data: Array2<f64>,
}

impl FeatureMatrix {
    /// Select cpu_usage and latency, missing values become 0
    pub fn from_records(records: &[TelemetryRecord]) -> Self {
        let mut data = Array2::zeros((records.len(), FEATURE_COUNT));
        for (i, record) in records.iter().enumerate() {
            data[[i, 0]] = record.cpu_or_zero();
            data[[i, 1]] = record.latency_or_zero();
        }
        Self { data }
    }

    /// Build from row vectors, all of the same non-zero width
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, ShapeError> {
        let width = rows.first().map(|r| r.len()).unwrap_or(FEATURE_COUNT);
        if width == 0 {
            return Err(ShapeError::EmptyLayout);
        }

        let mut flat = Vec::with_capacity(rows.len() * width);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(ShapeError::LengthMismatch {
                    what: format!("feature row {}", i),
                    expected: width,
                    actual: row.len(),
                });
            }
            flat.extend(row.iter().map(|v| if v.is_finite() { *v } else { 0.0 }));
        }

        Array2::from_shape_vec((rows.len(), width), flat)
            .map(|data| Self { data })
            .map_err(|_| ShapeError::LengthMismatch {
                what: "feature matrix".to_string(),
                expected: rows.len() * width,
                actual: rows.iter().map(|r| r.len()).sum(),
            })
    }

    pub fn from_array(data: Array2<f64>) -> Self {
        Self { data }
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.data.row(i)
    }

    pub fn array(&self) -> &Array2<f64> {
        &self.data
    }
}
