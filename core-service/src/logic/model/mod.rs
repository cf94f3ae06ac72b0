//! Model Module - Detector Ensemble
//!
//! Four independent detectors behind one `Detector` trait, combined by vote.
//! Add or remove detectors without touching the combination logic.

pub mod detector;
pub mod stats;
pub mod isolation_forest;
pub mod envelope;
pub mod autoencoder;
pub mod statistical;
pub mod ensemble;

#[cfg(test)]
mod tests;

pub use detector::{Detector, Labels};
pub use ensemble::{Ensemble, VerdictVector, VotePolicy, COMBINED};
pub use isolation_forest::IsolationForest;
pub use envelope::EllipticEnvelope;
pub use autoencoder::Autoencoder;
pub use statistical::ZScoreDetector;
