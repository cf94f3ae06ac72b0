//! Rule-based root cause
//!
//! Deterministic explanation built from the snapshot alone. Used whenever
//! the text-generation service gives no usable answer.

use super::types::{AnomalySnapshot, RootCauseCandidate, TriageOutcome};
use crate::logic::error::TriageError;

// Confidence per rule, first match wins
const CONF_ERROR_LOG: f64 = 0.9;
const CONF_HIGH_CPU: f64 = 0.85;
const CONF_HIGH_LATENCY: f64 = 0.8;
const CONF_MISSING_SPAN: f64 = 0.75;
const CONF_UNKNOWN: f64 = 0.7;

pub fn rule_based(snapshot: &AnomalySnapshot) -> RootCauseCandidate {
    let service = &snapshot.service;
    let cpu = snapshot.cpu_usage.unwrap_or(0.0);
    let latency = snapshot.latency.unwrap_or(0.0);

    let (root_cause, confidence) = if snapshot.log_level.is_error() {
        (
            format!(
                "{} log detected in {}, possibly due to a software bug or configuration error.",
                snapshot.log_level, service
            ),
            CONF_ERROR_LOG,
        )
    } else if cpu > 90.0 {
        (
            format!(
                "High CPU usage ({:.1}%) in {}, possibly due to a memory leak or inefficient code.",
                cpu, service
            ),
            CONF_HIGH_CPU,
        )
    } else if latency > 500.0 {
        (
            format!(
                "High latency ({:.1}ms) in {}, possibly due to network congestion or resource exhaustion.",
                latency, service
            ),
            CONF_HIGH_LATENCY,
        )
    } else if !snapshot.has_span() {
        (
            format!("Missing span ID in {}, indicating a tracing issue or service disruption.", service),
            CONF_MISSING_SPAN,
        )
    } else {
        (
            "Anomaly detected due to multiple factors, requiring further investigation.".to_string(),
            CONF_UNKNOWN,
        )
    };

    RootCauseCandidate { anomaly_id: snapshot.id, root_cause, confidence }
}

/// Map every failure to the rule-based candidate
pub fn recover(
    result: Result<RootCauseCandidate, TriageError>,
    snapshot: &AnomalySnapshot,
) -> TriageOutcome {
    match result {
        Ok(candidate) => TriageOutcome { candidate, fallback: None },
        Err(reason) => {
            log::warn!("Using rule-based root cause for anomaly {}: {}", snapshot.id, reason);
            TriageOutcome { candidate: rule_based(snapshot), fallback: Some(reason) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::telemetry::LogLevel;
    use chrono::Utc;

    fn snapshot() -> AnomalySnapshot {
        AnomalySnapshot {
            id: 12,
            timestamp: Utc::now(),
            service: "payment-service".to_string(),
            log_level: LogLevel::Info,
            cpu_usage: Some(40.0),
            latency: Some(90.0),
            trace_id: "trace_12".to_string(),
            span_id: Some("span_12".to_string()),
            event_type: "transaction".to_string(),
        }
    }

    #[test]
    fn test_rule_precedence() {
        let error = AnomalySnapshot { log_level: LogLevel::Error, cpu_usage: Some(99.0), ..snapshot() };
        let c = rule_based(&error);
        assert!(c.root_cause.starts_with("ERROR log detected in payment-service"));
        assert_eq!(c.confidence, CONF_ERROR_LOG);

        let cpu = AnomalySnapshot { cpu_usage: Some(96.0), latency: Some(700.0), ..snapshot() };
        assert!(rule_based(&cpu).root_cause.starts_with("High CPU usage (96.0%)"));

        let latency = AnomalySnapshot { latency: Some(700.0), ..snapshot() };
        assert!(rule_based(&latency).root_cause.starts_with("High latency (700.0ms)"));

        let span = AnomalySnapshot { span_id: None, ..snapshot() };
        assert!(rule_based(&span).root_cause.starts_with("Missing span ID"));

        assert_eq!(rule_based(&snapshot()).confidence, CONF_UNKNOWN);
    }

    #[test]
    fn test_confidence_range() {
        for s in [
            AnomalySnapshot { log_level: LogLevel::Fatal, ..snapshot() },
            AnomalySnapshot { cpu_usage: Some(91.0), ..snapshot() },
            AnomalySnapshot { latency: Some(501.0), ..snapshot() },
            AnomalySnapshot { span_id: None, ..snapshot() },
            snapshot(),
        ] {
            let c = rule_based(&s);
            assert!((0.7..=1.0).contains(&c.confidence));
            assert_eq!(c.anomaly_id, 12);
        }
    }

    #[test]
    fn test_recover() {
        let outcome = recover(Err(TriageError::Timeout), &snapshot());
        assert_eq!(outcome.fallback, Some(TriageError::Timeout));
        assert_eq!(outcome.candidate, rule_based(&snapshot()));

        let ok = RootCauseCandidate { anomaly_id: 12, root_cause: "disk".to_string(), confidence: 0.4 };
        let outcome = recover(Ok(ok.clone()), &snapshot());
        assert!(!outcome.is_fallback());
        assert_eq!(outcome.candidate, ok);
    }
}
