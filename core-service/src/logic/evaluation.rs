//! Evaluation Harness
//!
//! Precision and recall per detector (and for the combined verdict)
//! against ground-truth labels aligned with the scored batch.

use serde::{Deserialize, Serialize};

use super::error::ShapeError;
use super::model::VerdictVector;
use super::telemetry::TelemetryRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorScore {
    pub detector: String,
    pub precision: f64,
    pub recall: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub samples: usize,
    pub positives: usize,
    pub scores: Vec<DetectorScore>,
}

impl EvaluationResult {
    pub fn get(&self, detector: &str) -> Option<&DetectorScore> {
        self.scores.iter().find(|s| s.detector == detector)
    }

    pub fn log(&self) {
        log::info!(
            "Evaluation over {} records ({} truly anomalous)",
            self.samples,
            self.positives
        );
        for score in &self.scores {
            log::info!(
                "{}: precision={:.4}, recall={:.4}",
                score.detector,
                score.precision,
                score.recall
            );
        }
    }
}

/// Standard definitions; zero denominators yield 0
pub fn precision_recall(predicted: &[u8], truth: &[u8]) -> Result<(f64, f64), ShapeError> {
    if predicted.len() != truth.len() {
        return Err(ShapeError::LengthMismatch {
            what: "ground truth".to_string(),
            expected: predicted.len(),
            actual: truth.len(),
        });
    }

    let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
    for (&p, &t) in predicted.iter().zip(truth) {
        match (p != 0, t != 0) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, true) => fn_ += 1,
            (false, false) => {}
        }
    }

    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    Ok((ratio(tp, tp + fp), ratio(tp, tp + fn_)))
}

pub fn evaluate(verdicts: &VerdictVector, truth: &[u8]) -> Result<EvaluationResult, ShapeError> {
    let mut scores = Vec::new();
    for (name, labels) in verdicts.iter() {
        let (precision, recall) = precision_recall(labels, truth)?;
        scores.push(DetectorScore { detector: name.to_string(), precision, recall });
    }

    Ok(EvaluationResult {
        samples: truth.len(),
        positives: truth.iter().filter(|&&t| t != 0).count(),
        scores,
    })
}

/// Truly anomalous: ERROR/FATAL level, cpu above 90, latency above 500,
/// or no span
pub fn ground_truth(records: &[TelemetryRecord]) -> Vec<u8> {
    records
        .iter()
        .map(|r| {
            u8::from(
                r.log_level.is_error()
                    || r.cpu_or_zero() > 90.0
                    || r.latency_or_zero() > 500.0
                    || !r.has_span(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::model::VerdictVector;
    use crate::logic::telemetry::LogLevel;
    use approx::assert_abs_diff_eq;
    use chrono::Utc;

    #[test]
    fn test_precision_recall() {
        let (p, r) = precision_recall(&[1, 1, 0, 0, 1], &[1, 0, 0, 1, 1]).unwrap();
        assert_abs_diff_eq!(p, 2.0 / 3.0);
        assert_abs_diff_eq!(r, 2.0 / 3.0);
    }

    #[test]
    fn test_no_positive_truth_is_zero() {
        let (p, r) = precision_recall(&[1, 0, 1], &[0, 0, 0]).unwrap();
        assert_eq!((p, r), (0.0, 0.0));

        let (p, r) = precision_recall(&[0, 0, 0], &[0, 0, 0]).unwrap();
        assert_eq!((p, r), (0.0, 0.0));
        assert!(!p.is_nan() && !r.is_nan());
    }

    #[test]
    fn test_no_predictions_is_zero_precision() {
        let (p, r) = precision_recall(&[0, 0], &[1, 0]).unwrap();
        assert_eq!((p, r), (0.0, 0.0));
    }

    #[test]
    fn test_misaligned_truth_rejected() {
        assert!(matches!(
            precision_recall(&[0, 1], &[0]),
            Err(ShapeError::LengthMismatch { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn test_evaluate_includes_combined() {
        let verdicts = VerdictVector::from_votes(
            3,
            vec![("a".to_string(), vec![1, 0, 0]), ("b".to_string(), vec![1, 1, 0])],
            2,
        )
        .unwrap();
        let result = evaluate(&verdicts, &[1, 0, 0]).unwrap();

        assert_eq!(result.positives, 1);
        assert_eq!(result.scores.len(), 3);
        assert_abs_diff_eq!(result.get("b").unwrap().precision, 0.5);
        assert_abs_diff_eq!(result.get("combined").unwrap().precision, 1.0);
    }

    #[test]
    fn test_ground_truth_rule() {
        let base = TelemetryRecord {
            timestamp: Utc::now(),
            service: "web-server".to_string(),
            log_level: LogLevel::Info,
            message: String::new(),
            cpu_usage: Some(50.0),
            latency: Some(100.0),
            trace_id: "trace_0".to_string(),
            span_id: Some("span_0".to_string()),
            event_type: "request".to_string(),
        };
        let records = vec![
            base.clone(),
            TelemetryRecord { log_level: LogLevel::Fatal, ..base.clone() },
            TelemetryRecord { cpu_usage: Some(90.5), ..base.clone() },
            TelemetryRecord { latency: Some(500.0), ..base.clone() },
            TelemetryRecord { latency: Some(501.0), ..base.clone() },
            TelemetryRecord { span_id: None, ..base.clone() },
            TelemetryRecord { log_level: LogLevel::Warn, ..base },
        ];
        assert_eq!(ground_truth(&records), vec![0, 1, 1, 0, 1, 1, 0]);
    }
}
