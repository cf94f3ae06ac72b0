//! Queue service boundary
//!
//! Everything the adapter needs from a queue backend. `SqsClient` talks to a
//! managed service, `LocalQueue` keeps messages in process.

use std::time::Duration;

use super::message::{DeliveryReceipt, QueueMessage};
use crate::logic::error::QueueError;

/// Attributes passed on queue creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueAttributes {
    pub fifo: bool,
    pub content_dedup: bool,
    pub visibility_timeout: Duration,
}

pub trait QueueService: Send + Sync {
    /// Create (or look up) a queue, returning its url
    fn create_queue(&self, name: &str, attributes: &QueueAttributes) -> Result<String, QueueError>;

    fn send_message(
        &self,
        queue_url: &str,
        body: &str,
        group_id: &str,
    ) -> Result<DeliveryReceipt, QueueError>;

    fn receive_message(
        &self,
        queue_url: &str,
        max_count: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError>;

    fn delete_message(&self, queue_url: &str, receipt_handle: &str) -> Result<(), QueueError>;

    /// Zero makes the message visible again immediately
    fn change_visibility(
        &self,
        queue_url: &str,
        receipt_handle: &str,
        timeout: Duration,
    ) -> Result<(), QueueError>;
}
