//! Detector capability

use crate::logic::features::FeatureMatrix;

/// One label per record: 0 = normal, 1 = anomalous
pub type Labels = Vec<u8>;

/// Given a standardized feature matrix, return a binary label per row.
///
/// Implementations must return exactly `features.rows()` labels and must
/// not depend on any other detector's output.
pub trait Detector: Send + Sync {
    fn name(&self) -> &str;

    fn detect(&self, features: &FeatureMatrix) -> Labels;
}
