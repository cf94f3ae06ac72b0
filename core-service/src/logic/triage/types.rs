use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::error::TriageError;
use crate::logic::telemetry::record::canonical_ts;
use crate::logic::telemetry::{LogLevel, TelemetryRecord};

/// Fields of a flagged record, minus the free-text message.
/// Taken once when the record is flagged and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalySnapshot {
    pub id: u64,
    #[serde(with = "canonical_ts")]
    pub timestamp: DateTime<Utc>,
    pub service: String,
    pub log_level: LogLevel,
    pub cpu_usage: Option<f64>,
    pub latency: Option<f64>,
    pub trace_id: String,
    pub span_id: Option<String>,
    pub event_type: String,
}

impl AnomalySnapshot {
    pub fn from_record(id: u64, record: &TelemetryRecord) -> Self {
        Self {
            id,
            timestamp: record.timestamp,
            service: record.service.clone(),
            log_level: record.log_level,
            cpu_usage: record.cpu_usage,
            latency: record.latency,
            trace_id: record.trace_id.clone(),
            span_id: record.span_id.clone(),
            event_type: record.event_type.clone(),
        }
    }

    pub fn has_span(&self) -> bool {
        self.span_id.as_deref().map_or(false, |s| !s.is_empty())
    }
}

/// One suggested root cause, as written to `anomalies.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCauseCandidate {
    pub anomaly_id: u64,
    pub root_cause: String,
    /// Always within [0, 1]
    pub confidence: f64,
}

/// Candidate plus the reason the service answer was not used, if any
#[derive(Debug, Clone, PartialEq)]
pub struct TriageOutcome {
    pub candidate: RootCauseCandidate,
    pub fallback: Option<TriageError>,
}

impl TriageOutcome {
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}
