//! Error taxonomy
//!
//! Transport and response failures (queue, text generation) are recovered
//! where they happen. Shape errors fail a single batch. Only configuration
//! and output I/O errors reach the binary.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Queue backend failures
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue transport error: {0}")]
    Transport(String),

    #[error("queue service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("malformed queue response: {0}")]
    Malformed(String),

    #[error("queue has not been created")]
    NotCreated,

    #[error("unknown receipt handle: {0}")]
    UnknownReceipt(String),
}

/// Batch does not have the expected shape
#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("message {message_id} is not a telemetry record: {reason}")]
    Decode { message_id: String, reason: String },

    #[error("{what}: expected length {expected}, got {actual}")]
    LengthMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("feature layout is empty")]
    EmptyLayout,
}

/// Why the root-cause service produced no usable answer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriageError {
    #[error("root-cause service disabled")]
    Disabled,

    #[error("root-cause service timed out")]
    Timeout,

    #[error("root-cause transport error: {0}")]
    Transport(String),

    #[error("root-cause service returned status {status}")]
    Service { status: u16 },

    #[error("malformed root-cause response: {0}")]
    Malformed(String),
}

/// Baseline snapshot persistence
#[derive(Debug, Error)]
pub enum BaselineError {
    #[error("baseline io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("baseline parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(
        "feature layout mismatch: expected v{expected_version} ({expected_hash:x}), \
         found v{actual_version} ({actual_hash:x})"
    )]
    LayoutMismatch {
        expected_version: u8,
        actual_version: u8,
        expected_hash: u32,
        actual_hash: u32,
    },
}

/// Invalid configuration value
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Top-level pipeline error
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Baseline(#[from] BaselineError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
