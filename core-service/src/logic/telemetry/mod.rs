//! Telemetry Module
//!
//! MELT records (metrics, events, logs, traces) flowing into the pipeline.
//!
//! ## Structure
//! - `record.rs` - `TelemetryRecord`, `LogLevel`, canonical timestamps
//! - `generator.rs` - seeded synthetic data source
//! - `exporter.rs` - CSV / JSON report writers

pub mod record;
pub mod generator;
pub mod exporter;

pub use record::{canonical_timestamp, parse_timestamp, LogLevel, TelemetryRecord};
pub use generator::SyntheticGenerator;
pub use exporter::{export_csv, export_json};
