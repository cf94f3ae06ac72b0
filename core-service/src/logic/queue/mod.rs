//! Queue Module
//!
//! ## Structure
//! - `message.rs` - `QueueMessage`, receipts, handles
//! - `backend.rs` - `QueueService` boundary
//! - `sqs.rs` - managed queue client
//! - `local.rs` - lease-based in-process queue
//! - `adapter.rs` - `QueueAdapter` with local fallback

pub mod message;
pub mod backend;
pub mod sqs;
pub mod local;
pub mod adapter;


pub use adapter::QueueAdapter;
pub use backend::{QueueAttributes, QueueService};
pub use local::LocalQueue;
pub use message::{DeliveryReceipt, QueueHandle, QueueMessage, QueueMode};
pub use sqs::SqsClient;
