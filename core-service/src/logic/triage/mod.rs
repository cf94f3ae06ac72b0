//! Triage Module
//!
//! Root-cause suggestions for flagged records.
//!
//! ## Structure
//! - `types.rs` - `AnomalySnapshot`, `RootCauseCandidate`, `TriageOutcome`
//! - `client.rs` - `RootCauseService` boundary, `GroqClient`, response parsing
//! - `fallback.rs` - deterministic rule-based root cause
//! - `dispatcher.rs` - `TriageDispatcher`

pub mod types;
pub mod client;
pub mod fallback;
pub mod dispatcher;

#[cfg(test)]
mod tests;

pub use client::{parse_response, GroqClient, RootCauseService};
pub use dispatcher::TriageDispatcher;
pub use types::{AnomalySnapshot, RootCauseCandidate, TriageOutcome};
