//! Managed queue client (SQS JSON protocol)
//!
//! Blocking calls against an SQS-compatible endpoint. Requests are not
//! signed, so this targets local emulators or a signing proxy.

use std::collections::HashMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};

use super::backend::{QueueAttributes, QueueService};
use super::message::{DeliveryReceipt, QueueMessage};
use crate::logic::error::QueueError;

const CONTENT_TYPE: &str = "application/x-amz-json-1.0";
const TARGET_PREFIX: &str = "AmazonSQS";

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateQueueResponse {
    queue_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SendMessageResponse {
    message_id: String,
    #[serde(default)]
    sequence_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ReceiveMessageResponse {
    #[serde(default)]
    messages: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireMessage {
    message_id: String,
    receipt_handle: String,
    body: String,
    #[serde(default)]
    attributes: HashMap<String, String>,
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct SqsClient {
    endpoint: String,
    agent: ureq::Agent,
}

impl SqsClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            agent,
        }
    }

    fn call<T: DeserializeOwned>(&self, action: &str, payload: serde_json::Value) -> Result<T, QueueError> {
        let response = self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", CONTENT_TYPE)
            .set("X-Amz-Target", &format!("{}.{}", TARGET_PREFIX, action))
            .send_string(&payload.to_string());

        match response {
            Ok(resp) => {
                let body = resp
                    .into_string()
                    .map_err(|e| QueueError::Transport(e.to_string()))?;
                // Empty bodies are valid for actions without output
                let body = if body.trim().is_empty() { "{}".to_string() } else { body };
                serde_json::from_str(&body)
                    .map_err(|e| QueueError::Malformed(format!("{}: {}", action, e)))
            }
            Err(ureq::Error::Status(status, resp)) => {
                let message = resp.into_string().unwrap_or_default();
                Err(QueueError::Service { status, message })
            }
            Err(e) => Err(QueueError::Transport(e.to_string())),
        }
    }
}

/// SHA-256 of the body, hex encoded
pub fn deduplication_id(body: &str) -> String {
    hex::encode(Sha256::digest(body.as_bytes()))
}

impl QueueService for SqsClient {
    fn create_queue(&self, name: &str, attributes: &QueueAttributes) -> Result<String, QueueError> {
        let mut attrs = serde_json::Map::new();
        attrs.insert(
            "VisibilityTimeout".into(),
            attributes.visibility_timeout.as_secs().to_string().into(),
        );
        if attributes.fifo {
            attrs.insert("FifoQueue".into(), "true".into());
        }
        if attributes.content_dedup {
            attrs.insert("ContentBasedDeduplication".into(), "true".into());
        }

        let resp: CreateQueueResponse = self.call(
            "CreateQueue",
            json!({ "QueueName": name, "Attributes": attrs }),
        )?;
        Ok(resp.queue_url)
    }

    fn send_message(&self, queue_url: &str, body: &str, group_id: &str) -> Result<DeliveryReceipt, QueueError> {
        let resp: SendMessageResponse = self.call(
            "SendMessage",
            json!({
                "QueueUrl": queue_url,
                "MessageBody": body,
                "MessageGroupId": group_id,
                "MessageDeduplicationId": deduplication_id(body),
            }),
        )?;
        Ok(DeliveryReceipt {
            message_id: resp.message_id,
            sequence_number: resp.sequence_number,
        })
    }

    fn receive_message(
        &self,
        queue_url: &str,
        max_count: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let resp: ReceiveMessageResponse = self.call(
            "ReceiveMessage",
            json!({
                "QueueUrl": queue_url,
                "MaxNumberOfMessages": max_count,
                "VisibilityTimeout": visibility_timeout.as_secs(),
                "AttributeNames": ["ApproximateReceiveCount"],
            }),
        )?;

        Ok(resp
            .messages
            .into_iter()
            .map(|m| QueueMessage {
                receive_count: m
                    .attributes
                    .get("ApproximateReceiveCount")
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(1),
                message_id: m.message_id,
                receipt_handle: m.receipt_handle,
                body: m.body,
            })
            .collect())
    }

    fn delete_message(&self, queue_url: &str, receipt_handle: &str) -> Result<(), QueueError> {
        let _: serde_json::Value = self.call(
            "DeleteMessage",
            json!({ "QueueUrl": queue_url, "ReceiptHandle": receipt_handle }),
        )?;
        Ok(())
    }

    fn change_visibility(&self, queue_url: &str, receipt_handle: &str, timeout: Duration) -> Result<(), QueueError> {
        let _: serde_json::Value = self.call(
            "ChangeMessageVisibility",
            json!({
                "QueueUrl": queue_url,
                "ReceiptHandle": receipt_handle,
                "VisibilityTimeout": timeout.as_secs(),
            }),
        )?;
        Ok(())
    }
}
