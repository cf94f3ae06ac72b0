use super::*;
use crate::logic::config::{BaselineConfig, DetectorConfig};
use crate::logic::error::ShapeError;
use crate::logic::features::{FeatureMatrix, StandardScaler};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Reproducible N(50,10) cpu / N(100,20) latency batch with two planted
/// outliers: cpu 95 at index 5, latency 500 at index 10. Normal draws are
/// clipped at 2.5 standard deviations so only the planted rows are extreme.
fn scenario_batch(seed: u64) -> FeatureMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut draw = |mean: f64, std_dev: f64| {
        let value: f64 = Normal::new(mean, std_dev).unwrap().sample(&mut rng);
        value.clamp(mean - 2.5 * std_dev, mean + 2.5 * std_dev)
    };

    let mut cpu: Vec<f64> = (0..100).map(|_| draw(50.0, 10.0)).collect();
    let mut latency: Vec<f64> = (0..100).map(|_| draw(100.0, 20.0)).collect();
    cpu[5] = 95.0;
    latency[10] = 500.0;

    let rows: Vec<Vec<f64>> = cpu.into_iter().zip(latency).map(|(c, l)| vec![c, l]).collect();
    FeatureMatrix::from_rows(&rows).unwrap()
}

fn standardized_scenario() -> FeatureMatrix {
    StandardScaler::new(&BaselineConfig::default()).fit_transform(&scenario_batch(3))
}

/// Returns a fixed verdict regardless of input
struct Fixed {
    name: &'static str,
    labels: Labels,
}

impl Detector for Fixed {
    fn name(&self) -> &str {
        self.name
    }

    fn detect(&self, _features: &FeatureMatrix) -> Labels {
        self.labels.clone()
    }
}

fn fixed(name: &'static str, labels: &[u8]) -> Box<dyn Detector> {
    Box::new(Fixed { name, labels: labels.to_vec() })
}

fn batch(rows: usize) -> FeatureMatrix {
    FeatureMatrix::from_rows(&vec![vec![0.0, 0.0]; rows]).unwrap()
}

#[test]
fn test_every_verdict_matches_batch_length() {
    let ensemble = Ensemble::from_config(&DetectorConfig::default());
    let features = standardized_scenario();
    let verdicts = ensemble.detect(&features).unwrap();

    assert_eq!(
        verdicts.names(),
        vec!["isolation_forest", "one_class_envelope", "autoencoder", "z_score", "combined"]
    );
    for (name, labels) in verdicts.iter() {
        assert_eq!(labels.len(), 100, "{} has wrong length", name);
        assert!(labels.iter().all(|&l| l == 0 || l == 1), "{} is not binary", name);
    }
}

#[test]
fn test_planted_outliers_in_combined_verdict() {
    let ensemble = Ensemble::from_config(&DetectorConfig::default());
    let verdicts = ensemble.detect(&standardized_scenario()).unwrap();

    assert_eq!(verdicts.combined()[5], 1);
    assert_eq!(verdicts.combined()[10], 1);
    assert_eq!(verdicts.get("z_score").unwrap()[5], 1);
}

#[test]
fn test_combined_is_exact_majority() {
    let ensemble = Ensemble::new(
        vec![
            fixed("a", &[1, 1, 0, 0, 1]),
            fixed("b", &[1, 0, 0, 0, 1]),
            fixed("c", &[0, 0, 1, 0, 1]),
            fixed("d", &[0, 0, 0, 0, 1]),
        ],
        VotePolicy::default(),
    );
    assert_eq!(ensemble.required_votes(), 2);

    let verdicts = ensemble.detect(&batch(5)).unwrap();
    assert_eq!(verdicts.combined(), &vec![1, 0, 0, 0, 1]);
    assert_eq!(verdicts.anomalous_indices(), vec![0, 4]);

    // Cross-check against the per-record vote count
    for i in 0..5 {
        let votes: u8 = ["a", "b", "c", "d"].iter().map(|n| verdicts.get(n).unwrap()[i]).sum();
        assert_eq!(verdicts.combined()[i] == 1, votes >= 2);
    }
}

#[test]
fn test_vote_threshold_scales_with_detectors() {
    let policy = VotePolicy::new(0.5);
    assert_eq!(policy.required_votes(4), 2);
    assert_eq!(policy.required_votes(5), 3);
    assert_eq!(policy.required_votes(1), 1);
    assert_eq!(VotePolicy::new(1.0).required_votes(4), 4);
    assert_eq!(VotePolicy::new(0.01).required_votes(4), 1);

    let ensemble = Ensemble::new(vec![fixed("a", &[1]), fixed("b", &[1])], VotePolicy::default())
        .with_detector(fixed("c", &[0]));
    assert_eq!(ensemble.detector_names(), vec!["a", "b", "c"]);
    assert_eq!(ensemble.required_votes(), 2);
    assert_eq!(ensemble.detect(&batch(1)).unwrap().combined(), &vec![1]);
}

#[test]
fn test_wrong_length_verdict_is_shape_error() {
    let ensemble = Ensemble::new(vec![fixed("short", &[0, 1])], VotePolicy::default());
    match ensemble.detect(&batch(3)) {
        Err(ShapeError::LengthMismatch { expected, actual, .. }) => {
            assert_eq!(expected, 3);
            assert_eq!(actual, 2);
        }
        other => panic!("Expected LengthMismatch, got {:?}", other),
    }
}

#[test]
fn test_non_binary_labels_normalized() {
    let ensemble = Ensemble::new(vec![fixed("loud", &[0, 7])], VotePolicy::new(1.0));
    let verdicts = ensemble.detect(&batch(2)).unwrap();
    assert_eq!(verdicts.get("loud").unwrap(), &vec![0, 1]);
    assert_eq!(verdicts.combined(), &vec![0, 1]);
}

#[test]
fn test_empty_batch() {
    let ensemble = Ensemble::from_config(&DetectorConfig::default());
    let verdicts = ensemble.detect(&FeatureMatrix::from_records(&[])).unwrap();
    assert!(verdicts.is_empty());
    assert!(verdicts.iter().all(|(_, labels)| labels.is_empty()));
}

#[test]
fn test_verdicts_serialize_as_map() {
    let ensemble = Ensemble::new(vec![fixed("a", &[1, 0])], VotePolicy::new(1.0));
    let json = serde_json::to_value(ensemble.detect(&batch(2)).unwrap()).unwrap();
    assert_eq!(json["a"], serde_json::json!([1, 0]));
    assert_eq!(json["combined"], serde_json::json!([1, 0]));
}

#[test]
fn test_scenario_evaluation() {
    let ensemble = Ensemble::from_config(&DetectorConfig::default());
    let verdicts = ensemble.detect(&standardized_scenario()).unwrap();

    let mut truth = vec![0u8; 100];
    truth[5] = 1;
    truth[10] = 1;

    let result = crate::logic::evaluation::evaluate(&verdicts, &truth).unwrap();
    let combined = result.get(COMBINED).unwrap();
    assert!(combined.precision > 0.5, "precision {}", combined.precision);
    assert!(combined.recall > 0.5, "recall {}", combined.recall);
}
