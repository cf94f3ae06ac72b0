//! Isolation Forest
//!
//! Random axis-aligned splits isolate sparse points in fewer steps. The
//! anomaly score is `2^(-E[h(x)] / c(ψ))`; the top `contamination` share of
//! the batch is flagged.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::detector::{Detector, Labels};
use super::stats::flag_upper_tail;
use crate::logic::features::FeatureMatrix;

const EULER_GAMMA: f64 = 0.577_215_664_9;
const MAX_SAMPLES: usize = 256;

enum Node {
    Leaf { size: usize },
    Split { feature: usize, threshold: f64, left: Box<Node>, right: Box<Node> },
}

/// Average path length of an unsuccessful BST search over `n` points
fn c_factor(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

pub struct IsolationForest {
    trees: usize,
    contamination: f64,
    seed: u64,
}

impl IsolationForest {
    pub fn new(trees: usize, contamination: f64, seed: u64) -> Self {
        Self { trees: trees.max(1), contamination, seed }
    }

    fn build(
        &self,
        features: &FeatureMatrix,
        rows: Vec<usize>,
        depth: usize,
        limit: usize,
        rng: &mut StdRng,
    ) -> Node {
        if depth >= limit || rows.len() <= 1 {
            return Node::Leaf { size: rows.len() };
        }

        let feature = rng.gen_range(0..features.cols());
        let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
            let v = features.row(i)[feature];
            (lo.min(v), hi.max(v))
        });
        if hi <= lo {
            return Node::Leaf { size: rows.len() };
        }

        let threshold = lo + rng.gen::<f64>() * (hi - lo);
        let (left, right): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&i| features.row(i)[feature] < threshold);

        Node::Split {
            feature,
            threshold,
            left: Box::new(self.build(features, left, depth + 1, limit, rng)),
            right: Box::new(self.build(features, right, depth + 1, limit, rng)),
        }
    }

    fn path_length(node: &Node, point: &[f64]) -> f64 {
        let mut node = node;
        let mut depth = 0.0;
        loop {
            match node {
                Node::Leaf { size } => return depth + c_factor(*size),
                Node::Split { feature, threshold, left, right } => {
                    node = if point[*feature] < *threshold { left } else { right };
                    depth += 1.0;
                }
            }
        }
    }

    /// Anomaly score per row, in (0, 1]
    pub fn scores(&self, features: &FeatureMatrix) -> Vec<f64> {
        let n = features.rows();
        if n == 0 || features.cols() == 0 {
            return Vec::new();
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let psi = n.min(MAX_SAMPLES);
        let limit = (psi.max(2) as f64).log2().ceil() as usize;

        let forest: Vec<Node> = (0..self.trees)
            .map(|_| {
                let sample = rand::seq::index::sample(&mut rng, n, psi).into_vec();
                self.build(features, sample, 0, limit, &mut rng)
            })
            .collect();

        let norm = c_factor(psi);
        (0..n)
            .map(|i| {
                let point = features.row(i).to_vec();
                let mean_path = forest.iter().map(|t| Self::path_length(t, &point)).sum::<f64>()
                    / forest.len() as f64;
                if norm > 0.0 {
                    2f64.powf(-mean_path / norm)
                } else {
                    0.5
                }
            })
            .collect()
    }
}

impl Detector for IsolationForest {
    fn name(&self) -> &str {
        "isolation_forest"
    }

    fn detect(&self, features: &FeatureMatrix) -> Labels {
        flag_upper_tail(&self.scores(features), self.contamination)
    }
}
