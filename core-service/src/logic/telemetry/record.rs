//! Telemetry Record
//!
//! One MELT observation as produced by the generator and carried through
//! the queue. Timestamps travel as a canonical RFC 3339 string.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// LOG LEVEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Debug,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Fatal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// ERROR and FATAL
    pub fn is_error(&self) -> bool {
        matches!(self, LogLevel::Error | LogLevel::Fatal)
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" | "CRITICAL" => Ok(LogLevel::Fatal),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// A single telemetry observation.
///
/// `cpu_usage` and `latency` are optional on the wire; the feature
/// preprocessor substitutes 0 for missing values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    #[serde(with = "canonical_ts")]
    pub timestamp: DateTime<Utc>,
    pub service: String,
    pub log_level: LogLevel,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub cpu_usage: Option<f64>,
    #[serde(default)]
    pub latency: Option<f64>,
    pub trace_id: String,
    #[serde(default)]
    pub span_id: Option<String>,
    pub event_type: String,
}

impl TelemetryRecord {
    /// Timestamp in the form used on the wire
    pub fn canonical_timestamp(&self) -> String {
        canonical_timestamp(&self.timestamp)
    }

    pub fn cpu_or_zero(&self) -> f64 {
        self.cpu_usage.filter(|v| v.is_finite()).unwrap_or(0.0)
    }

    pub fn latency_or_zero(&self) -> f64 {
        self.latency.filter(|v| v.is_finite()).unwrap_or(0.0)
    }

    pub fn has_span(&self) -> bool {
        self.span_id.as_deref().map_or(false, |s| !s.is_empty())
    }
}

// ============================================================================
// CANONICAL TIMESTAMP
// ============================================================================

/// RFC 3339, UTC, microsecond precision
pub fn canonical_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Accepts RFC 3339 or a naive ISO-8601 timestamp (read as UTC)
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Ok(ts.with_timezone(&Utc)),
        Err(rfc_err) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|_| rfc_err),
    }
}

pub mod canonical_ts {
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::canonical_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> TelemetryRecord {
        TelemetryRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap(),
            service: "auth-service".to_string(),
            log_level: LogLevel::Warn,
            message: "Operation completed successfully in auth-service".to_string(),
            cpu_usage: Some(51.25),
            latency: Some(98.5),
            trace_id: "trace_7".to_string(),
            span_id: None,
            event_type: "request".to_string(),
        }
    }

    #[test]
    fn test_timestamp_is_canonical_string() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["timestamp"], "2024-03-01T12:30:05.000000Z");
        assert_eq!(json["log_level"], "WARN");
        assert!(json["span_id"].is_null());
    }

    #[test]
    fn test_naive_timestamp_accepted() {
        let ts = parse_timestamp("2024-03-01T12:30:05.123456").unwrap();
        assert_eq!(canonical_timestamp(&ts), "2024-03-01T12:30:05.123456Z");
    }

    #[test]
    fn test_missing_metrics_default_to_none() {
        let body = r#"{"timestamp":"2024-03-01T12:30:05Z","service":"db","log_level":"INFO",
            "trace_id":"trace_1","event_type":"system"}"#;
        let record: TelemetryRecord = serde_json::from_str(body).unwrap();
        assert_eq!(record.cpu_usage, None);
        assert_eq!(record.cpu_or_zero(), 0.0);
        assert_eq!(record.latency_or_zero(), 0.0);
        assert!(!record.has_span());
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!(LogLevel::Fatal.is_error());
        assert!(!LogLevel::Debug.is_error());
        assert!("TRACE".parse::<LogLevel>().is_err());
    }
}
