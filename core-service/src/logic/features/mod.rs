//! Features Module - Feature Preprocessor
//!
//! Turns a batch of telemetry records into the standardized matrix the
//! detector ensemble consumes.

pub mod layout;
pub mod matrix;
pub mod scaler;

pub use layout::{FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};
pub use matrix::FeatureMatrix;
pub use scaler::{BaselineSnapshot, RunningStats, StandardScaler};

use crate::logic::config::BaselineConfig;
use crate::logic::error::BaselineError;
use crate::logic::telemetry::TelemetryRecord;

pub struct FeaturePreprocessor {
    scaler: StandardScaler,
}

impl FeaturePreprocessor {
    pub fn new(config: &BaselineConfig) -> Self {
        Self { scaler: StandardScaler::new(config) }
    }

    /// Extract and standardize one batch
    pub fn prepare(&mut self, records: &[TelemetryRecord]) -> FeatureMatrix {
        let raw = FeatureMatrix::from_records(records);
        self.scaler.fit_transform(&raw)
    }

    pub fn persist(&self) -> Result<(), BaselineError> {
        self.scaler.persist()
    }
}
