//! Triage Dispatcher
//!
//! Sends each snapshot to the root-cause service and always comes back
//! with a structured candidate.

use super::client::{parse_response, GroqClient, RootCauseService};
use super::fallback::{recover, rule_based};
use super::types::{AnomalySnapshot, RootCauseCandidate, TriageOutcome};
use crate::logic::config::{LlmConfig, LlmProvider};
use crate::logic::error::TriageError;

pub struct TriageDispatcher {
    service: Option<Box<dyn RootCauseService>>,
}

impl TriageDispatcher {
    pub fn new(config: &LlmConfig) -> Self {
        match config.provider {
            LlmProvider::Groq if config.api_key.is_empty() => {
                log::warn!("GROQ_API_KEY not set, root causes will be rule-based");
                Self::without_service()
            }
            LlmProvider::Groq => Self::with_service(Box::new(GroqClient::new(config))),
            LlmProvider::Mock => Self::without_service(),
        }
    }

    pub fn with_service(service: Box<dyn RootCauseService>) -> Self {
        log::info!("Root-cause service: {}", service.name());
        Self { service: Some(service) }
    }

    /// Rule-based candidates only
    pub fn without_service() -> Self {
        Self { service: None }
    }

    /// Ask the service and parse its answer
    pub fn request(&self, snapshot: &AnomalySnapshot) -> Result<RootCauseCandidate, TriageError> {
        let service = self.service.as_ref().ok_or(TriageError::Disabled)?;
        let text = service.complete(snapshot)?;

        parse_response(&text, snapshot).ok_or_else(|| {
            log::error!("Failed to parse root-cause response for anomaly {}", snapshot.id);
            TriageError::Malformed(text.chars().take(200).collect())
        })
    }

    pub fn triage(&self, snapshot: &AnomalySnapshot) -> TriageOutcome {
        match self.service {
            Some(_) => recover(self.request(snapshot), snapshot),
            // No service configured is not worth a warning per anomaly
            None => TriageOutcome {
                candidate: rule_based(snapshot),
                fallback: Some(TriageError::Disabled),
            },
        }
    }

    pub fn triage_all(&self, snapshots: &[AnomalySnapshot]) -> Vec<TriageOutcome> {
        log::info!("Generating candidate root causes for {} anomalies", snapshots.len());
        snapshots.iter().map(|s| self.triage(s)).collect()
    }
}
