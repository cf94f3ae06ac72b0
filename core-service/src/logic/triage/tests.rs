use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{TimeZone, Utc};

use super::*;
use crate::logic::config::{LlmConfig, LlmProvider};
use crate::logic::error::TriageError;
use crate::logic::telemetry::{LogLevel, TelemetryRecord};

/// Service stand-in with a canned answer
struct FakeService {
    answer: Result<String, TriageError>,
    calls: Arc<AtomicUsize>,
}

impl FakeService {
    fn boxed(answer: Result<String, TriageError>) -> (Box<dyn RootCauseService>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (Box::new(Self { answer, calls: calls.clone() }), calls)
    }
}

impl RootCauseService for FakeService {
    fn name(&self) -> &str {
        "fake"
    }

    fn complete(&self, _snapshot: &AnomalySnapshot) -> Result<String, TriageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}

fn record() -> TelemetryRecord {
    TelemetryRecord {
        timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 9, 15, 0).unwrap(),
        service: "database".to_string(),
        log_level: LogLevel::Info,
        message: "Operation completed successfully in database".to_string(),
        cpu_usage: Some(95.0),
        latency: Some(80.0),
        trace_id: "trace_41".to_string(),
        span_id: Some("span_41".to_string()),
        event_type: "system".to_string(),
    }
}

fn snapshot() -> AnomalySnapshot {
    AnomalySnapshot::from_record(41, &record())
}

fn assert_structured(outcome: &TriageOutcome) {
    let json = serde_json::to_value(&outcome.candidate).unwrap();
    let object = json.as_object().unwrap();
    assert_eq!(object.len(), 3);
    assert!(object["anomaly_id"].is_u64());
    assert!(object["root_cause"].is_string());
    assert!(object["confidence"].is_f64());
}

#[test]
fn test_snapshot_drops_message() {
    let json = serde_json::to_value(snapshot()).unwrap();
    assert!(json.get("message").is_none());
    assert_eq!(json["id"], 41);
    assert_eq!(json["timestamp"], record().canonical_timestamp());
}

#[test]
fn test_timeout_falls_back_to_rules() {
    let (service, calls) = FakeService::boxed(Err(TriageError::Timeout));
    let dispatcher = TriageDispatcher::with_service(service);

    let outcome = dispatcher.triage(&snapshot());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.fallback, Some(TriageError::Timeout));
    assert_eq!(outcome.candidate.anomaly_id, 41);
    assert!(outcome.candidate.root_cause.contains("High CPU usage"));
    assert!((0.7..=1.0).contains(&outcome.candidate.confidence));
    assert_structured(&outcome);
}

#[test]
fn test_service_failures_all_recover() {
    for failure in [
        TriageError::Transport("connection reset".to_string()),
        TriageError::Service { status: 503 },
        TriageError::Malformed("truncated".to_string()),
    ] {
        let (service, _) = FakeService::boxed(Err(failure.clone()));
        let outcome = TriageDispatcher::with_service(service).triage(&snapshot());
        assert_eq!(outcome.fallback, Some(failure));
        assert!((0.7..=1.0).contains(&outcome.candidate.confidence));
    }
}

#[test]
fn test_unparseable_answer_falls_back() {
    let (service, _) = FakeService::boxed(Ok("I think the database is sad".to_string()));
    let outcome = TriageDispatcher::with_service(service).triage(&snapshot());

    assert!(matches!(outcome.fallback, Some(TriageError::Malformed(_))));
    assert_structured(&outcome);
}

#[test]
fn test_service_answer_used() {
    let answer = r#"{"anomaly_id": 41, "root_cause": "Connection pool exhausted", "confidence": 0.66}"#;
    let (service, _) = FakeService::boxed(Ok(answer.to_string()));
    let outcome = TriageDispatcher::with_service(service).triage(&snapshot());

    assert!(!outcome.is_fallback());
    assert_eq!(outcome.candidate.root_cause, "Connection pool exhausted");
    assert_eq!(outcome.candidate.confidence, 0.66);
}

#[test]
fn test_no_service_configured() {
    let mock = LlmConfig { provider: LlmProvider::Mock, ..LlmConfig::default() };
    let no_key = LlmConfig { api_key: String::new(), ..LlmConfig::default() };

    for config in [mock, no_key] {
        let dispatcher = TriageDispatcher::new(&config);
        assert_eq!(dispatcher.request(&snapshot()), Err(TriageError::Disabled));

        let outcomes = dispatcher.triage_all(&[snapshot(), snapshot()]);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.is_fallback()));
    }
}
