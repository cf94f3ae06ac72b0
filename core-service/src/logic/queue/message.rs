//! Queue message types

use serde::{Deserialize, Serialize};

use crate::logic::error::ShapeError;
use crate::logic::telemetry::TelemetryRecord;

/// Which backend a queue lives on. Fixed once the queue is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueMode {
    External,
    Local,
}

impl std::fmt::Display for QueueMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueMode::External => write!(f, "external"),
            QueueMode::Local => write!(f, "local"),
        }
    }
}

/// Result of `create_queue`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueHandle {
    pub name: String,
    pub url: String,
    pub mode: QueueMode,
}

/// Acknowledgement of an enqueued message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub message_id: String,
    pub sequence_number: Option<String>,
}

/// A dequeued message under a visibility lease
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub message_id: String,
    /// Opaque, only meaningful to `delete` / `release`
    pub receipt_handle: String,
    pub body: String,
    /// How many times this message has been handed out, this one included
    pub receive_count: u32,
}

impl QueueMessage {
    pub fn decode(&self) -> Result<TelemetryRecord, ShapeError> {
        serde_json::from_str(&self.body).map_err(|e| ShapeError::Decode {
            message_id: self.message_id.clone(),
            reason: e.to_string(),
        })
    }
}

/// Serialize a record into a message body
pub fn encode(record: &TelemetryRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string(record)
}
