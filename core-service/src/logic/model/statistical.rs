//! Statistical threshold detector

use super::detector::{Detector, Labels};
use crate::logic::features::FeatureMatrix;

/// Flags a row when any standardized feature exceeds `threshold` in magnitude
pub struct ZScoreDetector {
    threshold: f64,
}

impl ZScoreDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Detector for ZScoreDetector {
    fn name(&self) -> &str {
        "z_score"
    }

    fn detect(&self, features: &FeatureMatrix) -> Labels {
        features
            .array()
            .rows()
            .into_iter()
            .map(|row| u8::from(row.iter().any(|z| z.abs() > self.threshold)))
            .collect()
    }
}
