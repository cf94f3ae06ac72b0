//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! `PipelineConfig::from_env` reads these through the getters below.

// ============================================
// Queue
// ============================================

/// Default queue name
pub const DEFAULT_QUEUE_NAME: &str = "anomaly-detection-queue";

/// Message group used for FIFO ordering on the external queue
pub const DEFAULT_QUEUE_GROUP_ID: &str = "anomaly-detection";

/// Max messages per receive call
pub const DEFAULT_MAX_MESSAGES: usize = 10;

/// Hard cap of the managed queue service per receive call
pub const EXTERNAL_MAX_MESSAGES: usize = 10;

/// Visibility lease (seconds)
pub const DEFAULT_VISIBILITY_TIMEOUT: u64 = 30;

/// Receives after which a message is dead-lettered
pub const DEFAULT_MAX_RECEIVE_COUNT: u32 = 3;

// ============================================
// Detectors
// ============================================

pub const DEFAULT_CONTAMINATION: f64 = 0.01;
pub const DEFAULT_NU: f64 = 0.01;
pub const DEFAULT_Z_SCORE_THRESHOLD: f64 = 3.0;
pub const DEFAULT_TREES: usize = 100;
pub const DEFAULT_EPOCHS: usize = 200;
pub const DEFAULT_LEARNING_RATE: f64 = 0.05;

/// Fraction of voters needed for the combined verdict (0.5 of 4 = 2)
pub const DEFAULT_VOTE_FRACTION: f64 = 0.5;

pub const DEFAULT_SEED: u64 = 42;

// ============================================
// LLM
// ============================================

pub const DEFAULT_LLM_PROVIDER: &str = "groq";
pub const DEFAULT_LLM_MODEL: &str = "llama3-70b-8192";
pub const DEFAULT_LLM_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_LLM_MAX_TOKENS: u32 = 500;
pub const DEFAULT_LLM_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_LLM_TIMEOUT: u64 = 30;

// ============================================
// Data generation / run
// ============================================

pub const DEFAULT_DATA_SIZE: usize = 1000;
pub const DEFAULT_ERROR_RATE: f64 = 0.1;
pub const DEFAULT_ANOMALY_RATE: f64 = 0.1;

/// Producer-side send chunk
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

pub const DEFAULT_OUTPUT_DIR: &str = "outputs";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "anomaly-pipeline";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Read a string from environment or use default
pub fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an optional, non-empty string from environment
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

/// Read a raw value for later parsing; `None` when unset
pub fn env_raw(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|s| s.trim().to_string())
}
