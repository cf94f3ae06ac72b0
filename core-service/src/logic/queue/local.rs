//! In-process queue with visibility leases
//!
//! Received messages move to an in-flight map keyed by receipt handle.
//! Expired leases are reclaimed on the next receive and rejoin the visible
//! buffer in send order, giving the same redelivery contract as the managed
//! service.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use uuid::Uuid;

use super::backend::{QueueAttributes, QueueService};
use super::message::{DeliveryReceipt, QueueMessage};
use crate::logic::error::QueueError;

#[derive(Debug, Clone)]
struct Stored {
    seq: u64,
    message_id: String,
    body: String,
    receive_count: u32,
}

#[derive(Debug)]
struct Lease {
    stored: Stored,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct LocalState {
    next_seq: u64,
    visible: VecDeque<Stored>,
    in_flight: HashMap<String, Lease>,
}

impl LocalState {
    /// Move expired leases back to the visible buffer, keeping send order
    fn reclaim_expired(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .in_flight
            .iter()
            .filter(|(_, lease)| lease.expires_at <= now)
            .map(|(handle, _)| handle.clone())
            .collect();

        if expired.is_empty() {
            return;
        }

        for handle in expired {
            if let Some(lease) = self.in_flight.remove(&handle) {
                log::debug!("Lease expired for message {}", lease.stored.message_id);
                self.visible.push_back(lease.stored);
            }
        }
        self.visible.make_contiguous().sort_by_key(|s| s.seq);
    }
}

#[derive(Debug)]
pub struct LocalQueue {
    name: String,
    state: Mutex<LocalState>,
}

impl LocalQueue {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Mutex::new(LocalState::default()),
        }
    }

    pub fn url(&self) -> String {
        format!("local://{}", self.name)
    }

    pub fn push(&self, body: &str) -> DeliveryReceipt {
        let mut state = self.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;

        let message_id = Uuid::new_v4().to_string();
        state.visible.push_back(Stored {
            seq,
            message_id: message_id.clone(),
            body: body.to_string(),
            receive_count: 0,
        });

        DeliveryReceipt {
            message_id,
            sequence_number: Some(seq.to_string()),
        }
    }

    pub fn pop(&self, max_count: usize, lease: Duration) -> Vec<QueueMessage> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.reclaim_expired(now);

        let take = max_count.min(state.visible.len());
        let mut messages = Vec::with_capacity(take);

        for _ in 0..take {
            let Some(mut stored) = state.visible.pop_front() else { break };
            stored.receive_count += 1;

            let receipt_handle = Uuid::new_v4().to_string();
            messages.push(QueueMessage {
                message_id: stored.message_id.clone(),
                receipt_handle: receipt_handle.clone(),
                body: stored.body.clone(),
                receive_count: stored.receive_count,
            });
            state.in_flight.insert(receipt_handle, Lease { stored, expires_at: now + lease });
        }

        messages
    }

    pub fn ack(&self, receipt_handle: &str) -> Result<(), QueueError> {
        self.state
            .lock()
            .in_flight
            .remove(receipt_handle)
            .map(|_| ())
            .ok_or_else(|| QueueError::UnknownReceipt(receipt_handle.to_string()))
    }

    /// Extend or cut a lease. Zero returns the message to the visible buffer.
    pub fn set_lease(&self, receipt_handle: &str, timeout: Duration) -> Result<(), QueueError> {
        let mut state = self.state.lock();

        if timeout.is_zero() {
            let lease = state
                .in_flight
                .remove(receipt_handle)
                .ok_or_else(|| QueueError::UnknownReceipt(receipt_handle.to_string()))?;
            state.visible.push_back(lease.stored);
            state.visible.make_contiguous().sort_by_key(|s| s.seq);
            return Ok(());
        }

        match state.in_flight.get_mut(receipt_handle) {
            Some(lease) => {
                lease.expires_at = Instant::now() + timeout;
                Ok(())
            }
            None => Err(QueueError::UnknownReceipt(receipt_handle.to_string())),
        }
    }

    /// Messages currently visible
    pub fn visible_len(&self) -> usize {
        self.state.lock().visible.len()
    }

    /// Messages currently leased out
    pub fn in_flight_len(&self) -> usize {
        self.state.lock().in_flight.len()
    }
}

/// A local queue also serves as a stand-in for the managed service.
/// It holds a single buffer, so the queue url is ignored.
impl QueueService for LocalQueue {
    fn create_queue(&self, _name: &str, _attributes: &QueueAttributes) -> Result<String, QueueError> {
        Ok(self.url())
    }

    fn send_message(&self, _queue_url: &str, body: &str, _group_id: &str) -> Result<DeliveryReceipt, QueueError> {
        Ok(self.push(body))
    }

    fn receive_message(
        &self,
        _queue_url: &str,
        max_count: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        Ok(self.pop(max_count, visibility_timeout))
    }

    fn delete_message(&self, _queue_url: &str, receipt_handle: &str) -> Result<(), QueueError> {
        self.ack(receipt_handle)
    }

    fn change_visibility(&self, _queue_url: &str, receipt_handle: &str, timeout: Duration) -> Result<(), QueueError> {
        self.set_lease(receipt_handle, timeout)
    }
}
