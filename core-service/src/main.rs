//! Anomaly Pipeline - Main Entry Point

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use anomaly_pipeline::constants::{APP_NAME, APP_VERSION};
use anomaly_pipeline::logic::config::{BaselineScope, LlmProvider, PipelineConfig};
use anomaly_pipeline::Pipeline;

/// Generate MELT telemetry, score it through the queue-fed detector
/// ensemble and suggest root causes for the anomalies.
#[derive(Parser, Debug)]
#[command(name = APP_NAME, version = APP_VERSION)]
struct Args {
    /// Number of records to generate (overrides DATA_SIZE)
    #[arg(long)]
    records: Option<usize>,

    /// Directory for CSV / JSON outputs (overrides OUTPUT_DIR)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Seed for generation and detectors (overrides RANDOM_SEED)
    #[arg(long)]
    seed: Option<u64>,

    /// Root-cause provider: groq | mock
    #[arg(long)]
    provider: Option<LlmProvider>,

    /// Reference statistics: batch | global
    #[arg(long)]
    baseline_scope: Option<BaselineScope>,

    /// Skip whole-dataset evaluation
    #[arg(long)]
    skip_eval: bool,
}

impl Args {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(records) = self.records {
            config.generator.size = records;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(seed) = self.seed {
            config.generator.seed = Some(seed);
            config.detectors.seed = seed;
        }
        if let Some(provider) = self.provider {
            config.llm.provider = provider;
        }
        if let Some(scope) = self.baseline_scope {
            config.baseline.scope = scope;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting {} v{}", APP_NAME, APP_VERSION);

    let mut config = PipelineConfig::from_env().context("Invalid configuration")?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("Cannot create output directory {}", config.output_dir.display())
    })?;

    let mut pipeline = Pipeline::new(&config).skip_evaluation(args.skip_eval);
    let summary = pipeline.run().context("Pipeline run failed")?;

    log::info!(
        "Done: {} anomalies, outputs in {}",
        summary.anomalies,
        pipeline.output_dir().display()
    );

    Ok(())
}
