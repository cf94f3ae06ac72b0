//! Logic Module - Pipeline components
//!
//! ## Structure
//! - `config.rs` / `error.rs` - explicit configuration value and error taxonomy
//! - `telemetry/` - records, synthetic generator, exporter
//! - `queue/` - durable queue adapter (external + local lease-based backend)
//! - `features/` - feature preprocessor and baseline
//! - `model/` - detectors and ensemble
//! - `evaluation.rs` - precision / recall harness
//! - `triage/` - root-cause dispatcher with rule-based fallback
//! - `pipeline.rs` - producer / consumer loop

pub mod config;
pub mod error;

pub mod telemetry;
pub mod queue;
pub mod features;
pub mod model;
pub mod evaluation;
pub mod triage;
pub mod pipeline;
