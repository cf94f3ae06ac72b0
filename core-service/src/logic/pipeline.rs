//! Pipeline Loop
//!
//! Producer: generate telemetry, export it, enqueue it in chunks.
//! Consumer: drain the queue batch by batch (decode, standardize, score,
//! acknowledge), then triage the flagged records and write the outputs.
//!
//! Single-threaded. Each batch is fully processed before its messages are
//! deleted and the next `receive` is issued.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;

use super::config::{BaselineConfig, PipelineConfig};
use super::error::{PipelineResult, ShapeError};
use super::evaluation::{evaluate, ground_truth, EvaluationResult};
use super::features::FeaturePreprocessor;
use super::model::Ensemble;
use super::queue::{QueueAdapter, QueueMessage};
use super::telemetry::{export_csv, export_json, SyntheticGenerator, TelemetryRecord};
use super::triage::{AnomalySnapshot, RootCauseCandidate, TriageDispatcher};

pub const DATA_FILE: &str = "synthetic_data.csv";
pub const ANOMALIES_FILE: &str = "anomalies.json";
pub const EVALUATION_FILE: &str = "evaluation.json";

// ============================================================================
// RUN SUMMARY
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub generated: usize,
    pub enqueued: usize,
    pub processed: usize,
    pub batches: usize,
    pub failed_batches: usize,
    /// Undecodable messages handed back to the queue
    pub rejected: usize,
    /// Processed messages whose delete was refused
    pub unacked: usize,
    pub dead_lettered: usize,
    pub anomalies: usize,
    pub candidates: usize,
    pub fallback_candidates: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn log(&self) {
        log::info!(
            "Processed {} of {} enqueued records in {} batches ({} failed, {} dead-lettered)",
            self.processed,
            self.enqueued,
            self.batches,
            self.failed_batches,
            self.dead_lettered
        );
        if self.rejected > 0 || self.unacked > 0 {
            log::warn!(
                "{} undecodable deliveries rejected, {} deletes refused",
                self.rejected,
                self.unacked
            );
        }
        log::info!(
            "{} anomalies flagged, {} root-cause candidates ({} rule-based)",
            self.anomalies,
            self.candidates,
            self.fallback_candidates
        );
        log::info!("Total execution time: {:.2} seconds", self.elapsed.as_secs_f64());
    }
}

/// Consumer-side counters for one drain
#[derive(Debug, Default)]
struct DrainReport {
    processed: usize,
    batches: usize,
    failed_batches: usize,
    rejected: usize,
    unacked: usize,
    snapshots: Vec<AnomalySnapshot>,
}

/// Result of scoring one received batch
#[derive(Debug, Default)]
struct BatchOutcome {
    /// Indices into the batch of messages that decoded and were scored
    accepted: Vec<usize>,
    /// Indices of messages whose body is not a telemetry record
    rejected: Vec<usize>,
    snapshots: Vec<AnomalySnapshot>,
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct Pipeline {
    config: PipelineConfig,
    queue: QueueAdapter,
    preprocessor: FeaturePreprocessor,
    ensemble: Ensemble,
    dispatcher: TriageDispatcher,
    evaluate: bool,
}

impl Pipeline {
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_parts(config, QueueAdapter::new(&config.queue), TriageDispatcher::new(&config.llm))
    }

    /// Explicit queue and triage collaborators
    pub fn with_parts(
        config: &PipelineConfig,
        queue: QueueAdapter,
        dispatcher: TriageDispatcher,
    ) -> Self {
        let ensemble = Ensemble::from_config(&config.detectors);
        log::info!(
            "Detectors: {} ({} votes required)",
            ensemble.detector_names().join(", "),
            ensemble.required_votes()
        );

        Self {
            config: config.clone(),
            queue,
            preprocessor: FeaturePreprocessor::new(&config.baseline),
            ensemble,
            dispatcher,
            evaluate: true,
        }
    }

    pub fn skip_evaluation(mut self, skip: bool) -> Self {
        self.evaluate = !skip;
        self
    }

    fn output_path(&self, file: &str) -> PathBuf {
        self.config.output_dir.join(file)
    }

    /// Full run: generate, enqueue, drain, triage, export
    pub fn run(&mut self) -> PipelineResult<RunSummary> {
        let start = Instant::now();

        let records = SyntheticGenerator::new(&self.config.generator).generate();
        log::info!("Generated {} telemetry records", records.len());
        export_csv(&records, &self.output_path(DATA_FILE))?;

        let mut summary = self.run_records(&records)?;
        summary.generated = records.len();
        summary.elapsed = start.elapsed();
        summary.log();

        Ok(summary)
    }

    /// Enqueue, drain and triage an existing set of records
    pub fn run_records(&mut self, records: &[TelemetryRecord]) -> PipelineResult<RunSummary> {
        let start = Instant::now();

        let enqueued = self.produce(records);
        let report = self.drain();

        self.preprocessor.persist()?;

        let outcomes = self.dispatcher.triage_all(&report.snapshots);
        let candidates: Vec<RootCauseCandidate> =
            outcomes.iter().map(|o| o.candidate.clone()).collect();
        export_json(&candidates, &self.output_path(ANOMALIES_FILE))?;
        log::info!(
            "Anomalies with root causes saved to {}",
            self.output_path(ANOMALIES_FILE).display()
        );

        if self.evaluate {
            match self.evaluate_dataset(records) {
                Ok(result) => {
                    result.log();
                    export_json(&result, &self.output_path(EVALUATION_FILE))?;
                }
                Err(e) => log::error!("Evaluation skipped: {}", e),
            }
        }

        Ok(RunSummary {
            generated: records.len(),
            enqueued,
            processed: report.processed,
            batches: report.batches,
            failed_batches: report.failed_batches,
            rejected: report.rejected,
            unacked: report.unacked,
            dead_lettered: self.queue.dead_lettered(),
            anomalies: report.snapshots.len(),
            candidates: candidates.len(),
            fallback_candidates: outcomes.iter().filter(|o| o.is_fallback()).count(),
            elapsed: start.elapsed(),
        })
    }

    /// Send records in `chunk_size` chunks, returns how many were accepted
    pub fn produce(&mut self, records: &[TelemetryRecord]) -> usize {
        let handle = self.queue.create_queue();
        log::info!("Sending {} records to {} ({})", records.len(), handle.name, handle.mode);

        let mut sent = 0;
        for chunk in records.chunks(self.config.chunk_size) {
            sent += chunk.iter().filter_map(|r| self.queue.send(r)).count();
            log::debug!("Sent {} / {} records", sent, records.len());
        }

        if sent < records.len() {
            log::warn!("{} records could not be enqueued", records.len() - sent);
        }
        sent
    }

    /// Receive until the queue reports nothing visible.
    ///
    /// Undecodable messages are released on their own and eventually
    /// dead-lettered by the adapter; the rest of their batch is processed.
    fn drain(&mut self) -> DrainReport {
        let mut report = DrainReport::default();

        loop {
            let messages = self.queue.receive(self.config.queue.max_messages);
            if messages.is_empty() {
                break;
            }

            report.batches += 1;
            let first_id = report.processed as u64;

            match self.process_batch(&messages, first_id) {
                Ok(outcome) => {
                    for &i in &outcome.rejected {
                        self.queue.release(&messages[i]);
                    }
                    report.rejected += outcome.rejected.len();

                    for &i in &outcome.accepted {
                        if self.queue.delete(&messages[i]) {
                            report.processed += 1;
                        } else {
                            report.unacked += 1;
                        }
                    }
                    report.snapshots.extend(outcome.snapshots);
                    log::info!("Processed {} messages", report.processed);
                }
                Err(e) => {
                    log::error!("Batch {} failed: {}", report.batches, e);
                    report.failed_batches += 1;
                    for message in &messages {
                        self.queue.release(message);
                    }
                }
            }
        }

        report
    }

    /// Decode every message, score the decodable ones, and snapshot the
    /// records flagged by the combined verdict
    fn process_batch(
        &mut self,
        messages: &[QueueMessage],
        first_id: u64,
    ) -> Result<BatchOutcome, ShapeError> {
        let mut outcome = BatchOutcome::default();
        let mut records = Vec::with_capacity(messages.len());

        for (i, message) in messages.iter().enumerate() {
            match message.decode() {
                Ok(record) => {
                    outcome.accepted.push(i);
                    records.push(record);
                }
                Err(e) => {
                    log::error!("Rejecting message: {}", e);
                    outcome.rejected.push(i);
                }
            }
        }

        if records.is_empty() {
            return Ok(outcome);
        }

        let features = self.preprocessor.prepare(&records);
        let verdicts = self.ensemble.detect(&features)?;

        outcome.snapshots = verdicts
            .anomalous_indices()
            .into_iter()
            .map(|i| AnomalySnapshot::from_record(first_id + i as u64, &records[i]))
            .collect();

        Ok(outcome)
    }

    /// Score the whole dataset as one batch against the labelling rule
    pub fn evaluate_dataset(&self, records: &[TelemetryRecord]) -> Result<EvaluationResult, ShapeError> {
        let mut preprocessor = FeaturePreprocessor::new(&BaselineConfig::default());
        let features = preprocessor.prepare(records);
        let verdicts = self.ensemble.detect(&features)?;
        evaluate(&verdicts, &ground_truth(records))
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }
}
