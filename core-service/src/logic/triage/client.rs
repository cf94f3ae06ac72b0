//! Text-generation boundary
//!
//! `RootCauseService` returns the raw model text for a snapshot.
//! `GroqClient` talks to an OpenAI-compatible chat-completions endpoint.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde_json::{json, Value};

use super::types::{AnomalySnapshot, RootCauseCandidate};
use crate::logic::config::LlmConfig;
use crate::logic::error::TriageError;

pub const SYSTEM_PROMPT: &str = "You are a helpful DevOps engineer analyzing system anomalies.";

/// Outermost JSON object in free text
static JSON_OBJECT: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").ok());

pub trait RootCauseService: Send + Sync {
    fn name(&self) -> &str;

    /// Raw response text for one snapshot
    fn complete(&self, snapshot: &AnomalySnapshot) -> Result<String, TriageError>;
}

pub fn build_prompt(snapshot: &AnomalySnapshot) -> String {
    let metadata = serde_json::to_string_pretty(snapshot).unwrap_or_default();
    format!(
        "Based on the following metadata from a software system, generate a likely root cause:\n\
         {}\n\n\
         Return your answer in a JSON format with keys 'anomaly_id', 'root_cause', and 'confidence'.",
        metadata
    )
}

/// Lenient parse of a model answer.
///
/// Accepts bare JSON or JSON surrounded by prose / code fences. Confidence is
/// clamped into [0, 1] and a missing or unreadable `anomaly_id` is taken
/// from the snapshot. `None` if no usable object is found.
pub fn parse_response(text: &str, snapshot: &AnomalySnapshot) -> Option<RootCauseCandidate> {
    let value: Value = match serde_json::from_str(text.trim()) {
        Ok(value) => value,
        Err(_) => {
            let found = JSON_OBJECT.as_ref()?.find(text)?;
            serde_json::from_str(found.as_str()).ok()?
        }
    };

    let object = value.as_object()?;

    let root_cause = object.get("root_cause")?.as_str()?.trim().to_string();
    if root_cause.is_empty() {
        return None;
    }

    let confidence = match object.get("confidence")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    if !confidence.is_finite() {
        return None;
    }

    let anomaly_id = match object.get("anomaly_id") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .unwrap_or(snapshot.id);

    Some(RootCauseCandidate {
        anomaly_id,
        root_cause,
        confidence: confidence.clamp(0.0, 1.0),
    })
}

// ============================================================================
// GROQ
// ============================================================================

pub struct GroqClient {
    config: LlmConfig,
    agent: ureq::Agent,
}

impl GroqClient {
    pub fn new(config: &LlmConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self { config: config.clone(), agent }
    }
}

impl RootCauseService for GroqClient {
    fn name(&self) -> &str {
        "groq"
    }

    fn complete(&self, snapshot: &AnomalySnapshot) -> Result<String, TriageError> {
        if self.config.api_key.is_empty() {
            return Err(TriageError::Disabled);
        }

        let body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": build_prompt(snapshot)},
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "response_format": {"type": "json_object"},
        });

        let response = self
            .agent
            .post(&self.config.endpoint)
            .set("Authorization", &format!("Bearer {}", self.config.api_key))
            .set("Content-Type", "application/json")
            .send_string(&body.to_string());

        let text = match response {
            Ok(resp) => resp.into_string().map_err(|e| classify_io(&e))?,
            Err(ureq::Error::Status(status, _)) => return Err(TriageError::Service { status }),
            Err(ureq::Error::Transport(t)) => return Err(classify_transport(&t)),
        };

        let response_json: Value =
            serde_json::from_str(&text).map_err(|e| TriageError::Malformed(e.to_string()))?;

        response_json
            .get("choices")
            .and_then(|v| v.get(0))
            .and_then(|v| v.get("message"))
            .and_then(|v| v.get("content"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| TriageError::Malformed("no message content".to_string()))
    }
}

fn classify_io(err: &std::io::Error) -> TriageError {
    match err.kind() {
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => TriageError::Timeout,
        _ => TriageError::Transport(err.to_string()),
    }
}

fn classify_transport(err: &ureq::Transport) -> TriageError {
    let mut source = std::error::Error::source(err);
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            return classify_io(io);
        }
        source = e.source();
    }
    TriageError::Transport(err.to_string())
}
