//! Pipeline Configuration
//!
//! Built once at process start and handed to every component constructor.
//! Nothing in the pipeline reads ambient global settings.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{self, env_opt, env_raw, env_string};
use super::error::ConfigError;

// ============================================================================
// SECTIONS
// ============================================================================

/// Queue adapter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub name: String,
    /// Managed queue endpoint; `None` means the adapter starts in local mode
    pub endpoint: Option<String>,
    pub group_id: String,
    pub max_messages: usize,
    pub visibility_timeout_secs: u64,
    pub max_receive_count: u32,
    pub fifo: bool,
    pub content_dedup: bool,
}

impl QueueConfig {
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: constants::DEFAULT_QUEUE_NAME.to_string(),
            endpoint: None,
            group_id: constants::DEFAULT_QUEUE_GROUP_ID.to_string(),
            max_messages: constants::DEFAULT_MAX_MESSAGES,
            visibility_timeout_secs: constants::DEFAULT_VISIBILITY_TIMEOUT,
            max_receive_count: constants::DEFAULT_MAX_RECEIVE_COUNT,
            fifo: true,
            content_dedup: true,
        }
    }
}

/// Detector ensemble settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Assumed anomalous fraction (isolation forest, autoencoder)
    pub contamination: f64,
    /// Expected fraction outside the one-class boundary
    pub nu: f64,
    pub z_threshold: f64,
    pub trees: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    /// Combined verdict needs ceil(vote_fraction * detectors) votes
    pub vote_fraction: f64,
    pub seed: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            contamination: constants::DEFAULT_CONTAMINATION,
            nu: constants::DEFAULT_NU,
            z_threshold: constants::DEFAULT_Z_SCORE_THRESHOLD,
            trees: constants::DEFAULT_TREES,
            epochs: constants::DEFAULT_EPOCHS,
            learning_rate: constants::DEFAULT_LEARNING_RATE,
            vote_fraction: constants::DEFAULT_VOTE_FRACTION,
            seed: constants::DEFAULT_SEED,
        }
    }
}

/// Reference statistics lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BaselineScope {
    /// Fit on each batch, discard afterwards
    #[default]
    Batch,
    /// Running statistics accumulated across batches
    Global,
}

impl FromStr for BaselineScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "batch" | "per-batch" => Ok(Self::Batch),
            "global" => Ok(Self::Global),
            other => Err(format!("unknown baseline scope '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BaselineConfig {
    pub scope: BaselineScope,
    /// Where a global baseline is loaded from and saved to
    pub path: Option<PathBuf>,
}

/// Text-generation provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Groq,
    Mock,
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "mock" | "none" => Ok(Self::Mock),
            other => Err(format!("unknown llm provider '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub endpoint: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    #[serde(skip_serializing)]
    pub api_key: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Groq,
            model: constants::DEFAULT_LLM_MODEL.to_string(),
            endpoint: constants::DEFAULT_LLM_ENDPOINT.to_string(),
            max_tokens: constants::DEFAULT_LLM_MAX_TOKENS,
            temperature: constants::DEFAULT_LLM_TEMPERATURE,
            timeout_secs: constants::DEFAULT_LLM_TIMEOUT,
            api_key: String::new(),
        }
    }
}

/// Synthetic data generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub size: usize,
    pub error_rate: f64,
    pub anomaly_rate: f64,
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            size: constants::DEFAULT_DATA_SIZE,
            error_rate: constants::DEFAULT_ERROR_RATE,
            anomaly_rate: constants::DEFAULT_ANOMALY_RATE,
            seed: Some(constants::DEFAULT_SEED),
        }
    }
}

// ============================================================================
// PIPELINE CONFIG
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub queue: QueueConfig,
    pub detectors: DetectorConfig,
    pub baseline: BaselineConfig,
    pub llm: LlmConfig,
    pub generator: GeneratorConfig,
    pub chunk_size: usize,
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            detectors: DetectorConfig::default(),
            baseline: BaselineConfig::default(),
            llm: LlmConfig::default(),
            generator: GeneratorConfig::default(),
            chunk_size: constants::DEFAULT_CHUNK_SIZE,
            output_dir: PathBuf::from(constants::DEFAULT_OUTPUT_DIR),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables (after `.env`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let seed = parse_env("RANDOM_SEED", constants::DEFAULT_SEED)?;

        let config = Self {
            queue: QueueConfig {
                name: env_string("QUEUE_NAME", constants::DEFAULT_QUEUE_NAME),
                endpoint: env_opt("QUEUE_ENDPOINT"),
                group_id: env_string("QUEUE_GROUP_ID", constants::DEFAULT_QUEUE_GROUP_ID),
                max_messages: parse_env("QUEUE_MAX_MESSAGES", constants::DEFAULT_MAX_MESSAGES)?,
                visibility_timeout_secs: parse_env(
                    "QUEUE_VISIBILITY_TIMEOUT",
                    constants::DEFAULT_VISIBILITY_TIMEOUT,
                )?,
                max_receive_count: parse_env(
                    "QUEUE_MAX_RECEIVE_COUNT",
                    constants::DEFAULT_MAX_RECEIVE_COUNT,
                )?,
                ..QueueConfig::default()
            },
            detectors: DetectorConfig {
                contamination: parse_env(
                    "ISOLATION_FOREST_CONTAMINATION",
                    constants::DEFAULT_CONTAMINATION,
                )?,
                nu: parse_env("ONE_CLASS_NU", constants::DEFAULT_NU)?,
                z_threshold: parse_env("Z_SCORE_THRESHOLD", constants::DEFAULT_Z_SCORE_THRESHOLD)?,
                trees: parse_env("ISOLATION_FOREST_TREES", constants::DEFAULT_TREES)?,
                epochs: parse_env("AUTOENCODER_EPOCHS", constants::DEFAULT_EPOCHS)?,
                learning_rate: parse_env(
                    "AUTOENCODER_LEARNING_RATE",
                    constants::DEFAULT_LEARNING_RATE,
                )?,
                vote_fraction: parse_env("VOTE_FRACTION", constants::DEFAULT_VOTE_FRACTION)?,
                seed,
            },
            baseline: BaselineConfig {
                scope: parse_env("BASELINE_SCOPE", BaselineScope::Batch)?,
                path: env_opt("BASELINE_PATH").map(PathBuf::from),
            },
            llm: LlmConfig {
                provider: parse_env("LLM_PROVIDER", LlmProvider::Groq)?,
                model: env_string("LLM_MODEL", constants::DEFAULT_LLM_MODEL),
                endpoint: env_string("LLM_ENDPOINT", constants::DEFAULT_LLM_ENDPOINT),
                max_tokens: parse_env("LLM_MAX_TOKENS", constants::DEFAULT_LLM_MAX_TOKENS)?,
                temperature: parse_env("LLM_TEMPERATURE", constants::DEFAULT_LLM_TEMPERATURE)?,
                timeout_secs: parse_env("LLM_TIMEOUT_SECS", constants::DEFAULT_LLM_TIMEOUT)?,
                api_key: env_string("GROQ_API_KEY", ""),
            },
            generator: GeneratorConfig {
                size: parse_env("DATA_SIZE", constants::DEFAULT_DATA_SIZE)?,
                error_rate: parse_env("ERROR_RATE", constants::DEFAULT_ERROR_RATE)?,
                anomaly_rate: parse_env("ANOMALY_RATE", constants::DEFAULT_ANOMALY_RATE)?,
                seed: Some(seed),
            },
            chunk_size: parse_env("CHUNK_SIZE", constants::DEFAULT_CHUNK_SIZE)?,
            output_dir: PathBuf::from(env_string("OUTPUT_DIR", constants::DEFAULT_OUTPUT_DIR)),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.detectors;

        check_fraction("ISOLATION_FOREST_CONTAMINATION", d.contamination, 0.5)?;
        check_fraction("ONE_CLASS_NU", d.nu, 0.5)?;
        check_fraction("VOTE_FRACTION", d.vote_fraction, 1.0)?;

        if !(d.z_threshold > 0.0) {
            return Err(invalid("Z_SCORE_THRESHOLD", d.z_threshold, "must be positive"));
        }
        if d.trees == 0 {
            return Err(invalid("ISOLATION_FOREST_TREES", d.trees, "must be at least 1"));
        }
        if !(d.learning_rate > 0.0) {
            return Err(invalid("AUTOENCODER_LEARNING_RATE", d.learning_rate, "must be positive"));
        }
        if self.queue.max_messages == 0 {
            return Err(invalid("QUEUE_MAX_MESSAGES", self.queue.max_messages, "must be at least 1"));
        }
        if self.queue.max_receive_count == 0 {
            return Err(invalid(
                "QUEUE_MAX_RECEIVE_COUNT",
                self.queue.max_receive_count,
                "must be at least 1",
            ));
        }
        if self.chunk_size == 0 {
            return Err(invalid("CHUNK_SIZE", self.chunk_size, "must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(invalid("LLM_TEMPERATURE", self.llm.temperature, "must be within [0, 2]"));
        }
        for (key, rate) in [
            ("ERROR_RATE", self.generator.error_rate),
            ("ANOMALY_RATE", self.generator.anomaly_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(invalid(key, rate, "must be within [0, 1]"));
            }
        }

        Ok(())
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn parse_env<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env_raw(key) {
        None => Ok(default),
        Some(raw) if raw.is_empty() => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw,
            reason: "could not be parsed",
        }),
    }
}

fn check_fraction(key: &'static str, value: f64, max: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value <= max {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "fraction out of range",
        })
    }
}

fn invalid(key: &'static str, value: impl ToString, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { key, value: value.to_string(), reason }
}
