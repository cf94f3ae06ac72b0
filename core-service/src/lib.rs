//! Anomaly Pipeline
//!
//! MELT telemetry flows through a durable queue into a four-detector
//! ensemble. Flagged records get a suggested root cause.

pub mod constants;
pub mod logic;

pub use logic::config::PipelineConfig;
pub use logic::error::{PipelineError, PipelineResult};
pub use logic::pipeline::{Pipeline, RunSummary};
