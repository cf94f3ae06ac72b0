//! Reconstruction-error detector
//!
//! A d → h → d autoencoder with a tanh bottleneck, trained on the batch by
//! full-batch gradient descent. Rows that reconstruct worst are flagged.

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::detector::{Detector, Labels};
use super::stats::flag_upper_tail;
use crate::logic::features::FeatureMatrix;

pub struct Autoencoder {
    contamination: f64,
    epochs: usize,
    learning_rate: f64,
    seed: u64,
}

struct Weights {
    w1: Array2<f64>, // h x d
    b1: Array1<f64>,
    w2: Array2<f64>, // d x h
    b2: Array1<f64>,
}

impl Weights {
    /// Xavier-uniform initialisation
    fn init(d: usize, h: usize, rng: &mut StdRng) -> Self {
        let bound = (6.0 / (d + h) as f64).sqrt();
        let mut uniform = |rows: usize, cols: usize| Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-bound..bound));
        let w1 = uniform(h, d);
        let w2 = uniform(d, h);
        Self { w1, b1: Array1::zeros(h), w2, b2: Array1::zeros(d) }
    }

    fn encode(&self, x: &Array2<f64>) -> Array2<f64> {
        (x.dot(&self.w1.t()) + &self.b1).mapv(f64::tanh)
    }

    fn decode(&self, z: &Array2<f64>) -> Array2<f64> {
        z.dot(&self.w2.t()) + &self.b2
    }
}

impl Autoencoder {
    pub fn new(contamination: f64, epochs: usize, learning_rate: f64, seed: u64) -> Self {
        Self { contamination, epochs, learning_rate, seed }
    }

    /// Mean squared reconstruction error per row
    pub fn reconstruction_errors(&self, features: &FeatureMatrix) -> Vec<f64> {
        let x = features.array();
        let (n, d) = x.dim();
        if n == 0 || d == 0 {
            return Vec::new();
        }

        let h = (d / 2).max(1);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut weights = Weights::init(d, h, &mut rng);
        let scale = self.learning_rate / n as f64;

        for _ in 0..self.epochs {
            let z = weights.encode(x);
            let y = weights.decode(&z);

            // d(loss)/dy for loss = mean over columns of squared error
            let err = (&y - x) * (2.0 / d as f64);
            let back = err.dot(&weights.w2) * z.mapv(|v| 1.0 - v * v);

            let grad_w2 = err.t().dot(&z);
            let grad_b2 = err.sum_axis(Axis(0));
            let grad_w1 = back.t().dot(x);
            let grad_b1 = back.sum_axis(Axis(0));

            weights.w2.scaled_add(-scale, &grad_w2);
            weights.b2.scaled_add(-scale, &grad_b2);
            weights.w1.scaled_add(-scale, &grad_w1);
            weights.b1.scaled_add(-scale, &grad_b1);
        }

        let y = weights.decode(&weights.encode(x));
        (&y - x)
            .rows()
            .into_iter()
            .map(|r| r.iter().map(|v| v * v).sum::<f64>() / d as f64)
            .collect()
    }
}

impl Detector for Autoencoder {
    fn name(&self) -> &str {
        "autoencoder"
    }

    fn detect(&self, features: &FeatureMatrix) -> Labels {
        flag_upper_tail(&self.reconstruction_errors(features), self.contamination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_with_outlier() -> FeatureMatrix {
        // Points on a line compress into one hidden unit
        let mut rows: Vec<Vec<f64>> = (0..40)
            .map(|i| {
                let t = (i as f64 - 20.0) / 20.0;
                vec![t, t]
            })
            .collect();
        rows.push(vec![1.0, -1.0]);
        FeatureMatrix::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_training_reduces_error() {
        let m = line_with_outlier();
        let untrained: f64 = Autoencoder::new(0.05, 0, 0.05, 5).reconstruction_errors(&m).iter().sum();
        let trained: f64 = Autoencoder::new(0.05, 300, 0.1, 5).reconstruction_errors(&m).iter().sum();
        assert!(trained < untrained);
    }

    #[test]
    fn test_off_line_point_flagged() {
        let labels = Autoencoder::new(0.02, 400, 0.1, 5).detect(&line_with_outlier());
        assert_eq!(labels.len(), 41);
        assert_eq!(labels[40], 1);
        assert_eq!(labels.iter().map(|&l| l as usize).sum::<usize>(), 1);
    }

    #[test]
    fn test_empty_batch() {
        assert!(Autoencoder::new(0.01, 10, 0.05, 1).detect(&FeatureMatrix::from_records(&[])).is_empty());
    }
}
