//! Durable Queue Adapter
//!
//! Producer/consumer decoupling with at-least-once delivery. Queue creation
//! decides the mode: if the managed service cannot be reached, the adapter
//! switches to an in-process `LocalQueue` and stays there. Every later
//! failure is logged and degraded (None / empty), never propagated.

use std::time::Duration;

use super::backend::{QueueAttributes, QueueService};
use super::local::LocalQueue;
use super::message::{encode, DeliveryReceipt, QueueHandle, QueueMessage, QueueMode};
use super::sqs::SqsClient;
use crate::constants::EXTERNAL_MAX_MESSAGES;
use crate::logic::config::QueueConfig;
use crate::logic::error::QueueError;
use crate::logic::telemetry::TelemetryRecord;

const FIFO_SUFFIX: &str = ".fifo";

/// HTTP timeout for managed queue calls
const SERVICE_TIMEOUT: Duration = Duration::from_secs(10);

enum Backend {
    External { service: Box<dyn QueueService>, url: String },
    Local(LocalQueue),
}

pub struct QueueAdapter {
    config: QueueConfig,
    service: Option<Box<dyn QueueService>>,
    backend: Option<Backend>,
    handle: Option<QueueHandle>,
    dead_lettered: usize,
}

impl QueueAdapter {
    /// Managed service from `config.endpoint`, if any
    pub fn new(config: &QueueConfig) -> Self {
        let service = config
            .endpoint
            .as_deref()
            .map(|endpoint| Box::new(SqsClient::new(endpoint, SERVICE_TIMEOUT)) as Box<dyn QueueService>);
        Self::build(config, service)
    }

    /// Use the given service as the managed backend
    pub fn with_service(config: &QueueConfig, service: Box<dyn QueueService>) -> Self {
        Self::build(config, Some(service))
    }

    fn build(config: &QueueConfig, service: Option<Box<dyn QueueService>>) -> Self {
        Self {
            config: config.clone(),
            service,
            backend: None,
            handle: None,
            dead_lettered: 0,
        }
    }

    /// Queue name as created on the backend
    pub fn queue_name(&self) -> String {
        let name = &self.config.name;
        if self.config.fifo && !name.ends_with(FIFO_SUFFIX) {
            format!("{}{}", name, FIFO_SUFFIX)
        } else {
            name.clone()
        }
    }

    /// Idempotent. The first call fixes the mode for the adapter's lifetime.
    pub fn create_queue(&mut self) -> QueueHandle {
        if let Some(handle) = &self.handle {
            return handle.clone();
        }

        let name = self.queue_name();
        let attributes = QueueAttributes {
            fifo: self.config.fifo,
            content_dedup: self.config.content_dedup,
            visibility_timeout: self.config.visibility_timeout(),
        };

        let external = match self.service.take() {
            Some(service) => match service.create_queue(&name, &attributes) {
                Ok(url) => Some((service, url)),
                Err(e) => {
                    log::error!("Error creating queue {}: {}", name, e);
                    None
                }
            },
            None => {
                log::warn!("No queue endpoint configured");
                None
            }
        };

        let handle = match external {
            Some((service, url)) => {
                log::info!("Created queue {} at {}", name, url);
                let handle = QueueHandle { name, url: url.clone(), mode: QueueMode::External };
                self.backend = Some(Backend::External { service, url });
                handle
            }
            None => {
                log::info!("Using local queue for {}", name);
                let local = LocalQueue::new(&name);
                let handle = QueueHandle { name, url: local.url(), mode: QueueMode::Local };
                self.backend = Some(Backend::Local(local));
                handle
            }
        };

        self.handle = Some(handle.clone());
        handle
    }

    pub fn mode(&self) -> Option<QueueMode> {
        self.handle.as_ref().map(|h| h.mode)
    }

    /// Serialize and enqueue a record. `None` when the message was not accepted.
    pub fn send(&self, record: &TelemetryRecord) -> Option<DeliveryReceipt> {
        let body = match encode(record) {
            Ok(body) => body,
            Err(e) => {
                log::error!("Error serializing record {}: {}", record.trace_id, e);
                return None;
            }
        };

        match &self.backend {
            Some(Backend::External { service, url }) => {
                match service.send_message(url, &body, &self.config.group_id) {
                    Ok(receipt) => Some(receipt),
                    Err(e) => {
                        log::error!("Error sending message: {}", e);
                        None
                    }
                }
            }
            Some(Backend::Local(local)) => Some(local.push(&body)),
            None => {
                log::error!("Error sending message: {}", QueueError::NotCreated);
                None
            }
        }
    }

    /// Up to `max_messages` messages, each under a fresh visibility lease.
    ///
    /// Messages received more than `max_receive_count` times are deleted
    /// here and never returned. If a whole receive was dead-lettered the
    /// backend is asked again, so an empty result means nothing is visible.
    pub fn receive(&mut self, max_messages: usize) -> Vec<QueueMessage> {
        loop {
            let messages = self.receive_once(max_messages);
            if messages.is_empty() {
                return messages;
            }

            let limit = self.config.max_receive_count;
            let (poisoned, healthy): (Vec<_>, Vec<_>) =
                messages.into_iter().partition(|m| m.receive_count > limit);

            let mut dropped = 0;
            for message in &poisoned {
                log::warn!(
                    "Dead-lettering message {} after {} receives",
                    message.message_id,
                    message.receive_count
                );
                if self.delete(message) {
                    dropped += 1;
                }
            }
            self.dead_lettered += dropped;

            // Nothing left the queue, asking again would return the same messages
            if !healthy.is_empty() || dropped == 0 {
                return healthy;
            }
        }
    }

    fn receive_once(&self, max_messages: usize) -> Vec<QueueMessage> {
        let lease = self.config.visibility_timeout();

        let received = match &self.backend {
            Some(Backend::External { service, url }) => {
                service.receive_message(url, max_messages.min(EXTERNAL_MAX_MESSAGES), lease)
            }
            Some(Backend::Local(local)) => Ok(local.pop(max_messages, lease)),
            None => Err(QueueError::NotCreated),
        };

        received.unwrap_or_else(|e| {
            log::error!("Error receiving messages: {}", e);
            Vec::new()
        })
    }

    /// Acknowledge a processed message. Returns false if the backend refused.
    pub fn delete(&self, message: &QueueMessage) -> bool {
        let result = match &self.backend {
            Some(Backend::External { service, url }) => {
                service.delete_message(url, &message.receipt_handle)
            }
            Some(Backend::Local(local)) => local.ack(&message.receipt_handle),
            None => Err(QueueError::NotCreated),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                log::error!("Error deleting message {}: {}", message.message_id, e);
                false
            }
        }
    }

    /// Give a message back before its lease runs out
    pub fn release(&self, message: &QueueMessage) -> bool {
        let result = match &self.backend {
            Some(Backend::External { service, url }) => {
                service.change_visibility(url, &message.receipt_handle, Duration::ZERO)
            }
            Some(Backend::Local(local)) => local.set_lease(&message.receipt_handle, Duration::ZERO),
            None => Err(QueueError::NotCreated),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                log::error!("Error releasing message {}: {}", message.message_id, e);
                false
            }
        }
    }

    /// Messages dropped by the receive-count guard
    pub fn dead_lettered(&self) -> usize {
        self.dead_lettered
    }
}
