//! Synthetic MELT Generator
//!
//! Produces a day of telemetry with injected error logs, metric spikes
//! and missing spans. Seedable so runs and tests are reproducible.

use chrono::{Duration, Utc};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use super::record::{LogLevel, TelemetryRecord};
use crate::logic::config::GeneratorConfig;

pub const SERVICES: [&str; 5] = [
    "web-server",
    "auth-service",
    "payment-service",
    "user-service",
    "database",
];

pub const EVENT_TYPES: [&str; 4] = ["request", "response", "system", "transaction"];

/// INFO, DEBUG, WARN, ERROR, FATAL
const LEVEL_WEIGHTS: [f64; 5] = [0.5, 0.3, 0.1, 0.05, 0.05];

const SECONDS_PER_DAY: i64 = 86_400;

// Baseline metric distributions
const CPU_MEAN: f64 = 50.0;
const CPU_STD_DEV: f64 = 10.0;
const LATENCY_MEAN: f64 = 100.0;
const LATENCY_STD_DEV: f64 = 20.0;

pub struct SyntheticGenerator {
    config: GeneratorConfig,
    rng: StdRng,
}

impl SyntheticGenerator {
    pub fn new(config: &GeneratorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config: config.clone(), rng }
    }

    pub fn generate(&mut self) -> Vec<TelemetryRecord> {
        let size = self.config.size;
        log::info!("Generating {} synthetic MELT records", size);

        let start = Utc::now() - Duration::days(1);
        let mut timestamps: Vec<_> = (0..size)
            .map(|_| start + Duration::seconds(self.rng.gen_range(0..=SECONDS_PER_DAY)))
            .collect();
        timestamps.sort();

        // Weights and parameters are constant and valid
        let levels = WeightedIndex::new(LEVEL_WEIGHTS).ok();
        let cpu_dist = Normal::new(CPU_MEAN, CPU_STD_DEV).ok();
        let latency_dist = Normal::new(LATENCY_MEAN, LATENCY_STD_DEV).ok();

        let mut records = Vec::with_capacity(size);
        for (i, timestamp) in timestamps.into_iter().enumerate() {
            let service = SERVICES[self.rng.gen_range(0..SERVICES.len())].to_string();
            let log_level = levels
                .as_ref()
                .map(|dist| LogLevel::ALL[dist.sample(&mut self.rng)])
                .unwrap_or(LogLevel::Info);

            let message = if log_level.is_error() && self.rng.gen::<f64>() < self.config.error_rate {
                format!("Error in {} at {}", service, timestamp.to_rfc3339())
            } else {
                format!("Operation completed successfully in {}", service)
            };

            let mut cpu_usage = cpu_dist.map_or(CPU_MEAN, |d| d.sample(&mut self.rng));
            let mut latency = latency_dist.map_or(LATENCY_MEAN, |d| d.sample(&mut self.rng));
            if self.rng.gen::<f64>() < self.config.anomaly_rate {
                cpu_usage = self.rng.gen_range(90..=100) as f64;
                latency = self.rng.gen_range(500..=1000) as f64;
            }

            let span_id = if self.rng.gen::<f64>() < self.config.anomaly_rate {
                None
            } else {
                Some(format!("span_{}", i))
            };

            let event_type = EVENT_TYPES[self.rng.gen_range(0..EVENT_TYPES.len())].to_string();

            records.push(TelemetryRecord {
                timestamp,
                service,
                log_level,
                message,
                cpu_usage: Some(cpu_usage),
                latency: Some(latency),
                trace_id: format!("trace_{}", i),
                span_id,
                event_type,
            });
        }

        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(size: usize) -> Vec<TelemetryRecord> {
        let config = GeneratorConfig {
            size,
            seed: Some(7),
            ..GeneratorConfig::default()
        };
        SyntheticGenerator::new(&config).generate()
    }

    #[test]
    fn test_data_generation() {
        let records = generate(1000);
        assert_eq!(records.len(), 1000);

        let error_logs = records.iter().filter(|r| r.log_level.is_error()).count();
        let high_cpu = records.iter().filter(|r| r.cpu_or_zero() > 90.0).count();
        let missing_spans = records.iter().filter(|r| !r.has_span()).count();

        assert!(error_logs > 0, "Should have error logs");
        assert!(high_cpu > 0, "Should have high CPU values");
        assert!(missing_spans > 0, "Should have missing spans");
    }

    #[test]
    fn test_timestamps_sorted() {
        let records = generate(200);
        assert!(records.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_seed_is_reproducible() {
        let a = generate(50);
        let b = generate(50);
        let cpu_a: Vec<_> = a.iter().map(|r| r.cpu_usage).collect();
        let cpu_b: Vec<_> = b.iter().map(|r| r.cpu_usage).collect();
        assert_eq!(cpu_a, cpu_b);
        assert_eq!(a[3].trace_id, "trace_3");
    }
}
