//! Detector Ensemble
//!
//! Runs every detector over the same matrix and derives the combined
//! verdict by vote. The vote threshold is fixed when the ensemble is built.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::autoencoder::Autoencoder;
use super::detector::{Detector, Labels};
use super::envelope::EllipticEnvelope;
use super::isolation_forest::IsolationForest;
use super::statistical::ZScoreDetector;
use crate::logic::config::DetectorConfig;
use crate::logic::error::ShapeError;
use crate::logic::features::FeatureMatrix;

/// Name of the derived verdict
pub const COMBINED: &str = "combined";

// ============================================================================
// VOTE POLICY
// ============================================================================

/// Combined verdict needs `ceil(fraction * voters)` votes, at least one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VotePolicy {
    fraction: f64,
}

impl VotePolicy {
    pub fn new(fraction: f64) -> Self {
        Self { fraction: fraction.clamp(f64::MIN_POSITIVE, 1.0) }
    }

    pub fn required_votes(&self, voters: usize) -> usize {
        ((self.fraction * voters as f64 - 1e-9).ceil() as usize).clamp(1, voters.max(1))
    }
}

impl Default for VotePolicy {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_VOTE_FRACTION)
    }
}

// ============================================================================
// VERDICT VECTOR
// ============================================================================

/// Labels per detector for one batch, plus the derived combined verdict
#[derive(Debug, Clone, PartialEq)]
pub struct VerdictVector {
    len: usize,
    verdicts: Vec<(String, Labels)>,
    combined: Labels,
}

impl VerdictVector {
    /// Every verdict must be `len` long. Non-zero labels count as 1.
    pub fn from_votes(
        len: usize,
        verdicts: Vec<(String, Labels)>,
        required_votes: usize,
    ) -> Result<Self, ShapeError> {
        let mut votes = vec![0usize; len];
        let mut normalized = Vec::with_capacity(verdicts.len());

        for (name, labels) in verdicts {
            if labels.len() != len {
                return Err(ShapeError::LengthMismatch {
                    what: format!("verdict of {}", name),
                    expected: len,
                    actual: labels.len(),
                });
            }
            let labels: Labels = labels.into_iter().map(|l| u8::from(l != 0)).collect();
            for (count, &label) in votes.iter_mut().zip(&labels) {
                *count += label as usize;
            }
            normalized.push((name, labels));
        }

        let combined = votes.into_iter().map(|v| u8::from(v >= required_votes)).collect();
        Ok(Self { len, verdicts: normalized, combined })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Detector verdict, or the combined one for `COMBINED`
    pub fn get(&self, name: &str) -> Option<&Labels> {
        if name == COMBINED {
            return Some(&self.combined);
        }
        self.verdicts.iter().find(|(n, _)| n == name).map(|(_, l)| l)
    }

    pub fn combined(&self) -> &Labels {
        &self.combined
    }

    /// Detector names in ensemble order, `COMBINED` last
    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|(name, _)| name).collect()
    }

    /// All verdicts including the combined one
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Labels)> {
        self.verdicts
            .iter()
            .map(|(n, l)| (n.as_str(), l))
            .chain(std::iter::once((COMBINED, &self.combined)))
    }

    /// Indices flagged by the combined verdict
    pub fn anomalous_indices(&self) -> Vec<usize> {
        self.combined
            .iter()
            .enumerate()
            .filter_map(|(i, &l)| (l == 1).then_some(i))
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.get(name).map(|l| l.iter().map(|&v| v as usize).sum()).unwrap_or(0)
    }
}

impl Serialize for VerdictVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.verdicts.len() + 1))?;
        for (name, labels) in self.iter() {
            map.serialize_entry(name, labels)?;
        }
        map.end()
    }
}

// ============================================================================
// ENSEMBLE
// ============================================================================

pub struct Ensemble {
    detectors: Vec<Box<dyn Detector>>,
    policy: VotePolicy,
}

impl Ensemble {
    pub fn new(detectors: Vec<Box<dyn Detector>>, policy: VotePolicy) -> Self {
        Self { detectors, policy }
    }

    /// The four standard detectors in fixed order
    pub fn from_config(config: &DetectorConfig) -> Self {
        let detectors: Vec<Box<dyn Detector>> = vec![
            Box::new(IsolationForest::new(config.trees, config.contamination, config.seed)),
            Box::new(EllipticEnvelope::new(config.nu)),
            Box::new(Autoencoder::new(
                config.contamination,
                config.epochs,
                config.learning_rate,
                config.seed.wrapping_add(1),
            )),
            Box::new(ZScoreDetector::new(config.z_threshold)),
        ];
        Self::new(detectors, VotePolicy::new(config.vote_fraction))
    }

    pub fn with_detector(mut self, detector: Box<dyn Detector>) -> Self {
        self.detectors.push(detector);
        self
    }

    pub fn detector_names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub fn required_votes(&self) -> usize {
        self.policy.required_votes(self.detectors.len())
    }

    /// Score one batch
    pub fn detect(&self, features: &FeatureMatrix) -> Result<VerdictVector, ShapeError> {
        let verdicts = self
            .detectors
            .iter()
            .map(|d| (d.name().to_string(), d.detect(features)))
            .collect();

        let result = VerdictVector::from_votes(features.rows(), verdicts, self.required_votes())?;

        for (name, _) in result.iter() {
            log::debug!("{}: {} of {} flagged", name, result.count(name), result.len());
        }

        Ok(result)
    }
}
