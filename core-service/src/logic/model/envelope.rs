//! One-class envelope
//!
//! Fits an ellipse around the bulk of the batch and flags points outside
//! it. The bulk is chosen with a robust (median / MAD) distance, so the
//! outliers themselves do not inflate the fitted covariance.

use ndarray::{Array1, Array2, Axis};

use super::detector::{Detector, Labels};
use super::stats::{chi2_quantile, invert, median};
use crate::logic::features::FeatureMatrix;

/// Scales MAD to a normal standard deviation
const MAD_TO_SIGMA: f64 = 1.4826;
const SUPPORT_FRACTION: f64 = 0.75;

pub struct EllipticEnvelope {
    nu: f64,
}

impl EllipticEnvelope {
    pub fn new(nu: f64) -> Self {
        Self { nu }
    }

    /// Squared Mahalanobis distances, consistency-corrected so their median
    /// matches the chi-squared median. `None` for batches too small to fit.
    pub fn distances(&self, features: &FeatureMatrix) -> Option<Vec<f64>> {
        let x = features.array();
        let (n, d) = x.dim();
        if d == 0 || n < d + 2 {
            return None;
        }

        // Robust centre and scale
        let centre: Vec<f64> = (0..d).map(|j| median(&x.column(j).to_vec())).collect();
        let scale: Vec<f64> = (0..d)
            .map(|j| {
                let dev: Vec<f64> = x.column(j).iter().map(|v| (v - centre[j]).abs()).collect();
                let mad = median(&dev) * MAD_TO_SIGMA;
                if mad > 1e-12 { mad } else { 1.0 }
            })
            .collect();

        let robust: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|r| r.iter().enumerate().map(|(j, v)| ((v - centre[j]) / scale[j]).powi(2)).sum())
            .collect();

        let h = (d + 1).max((SUPPORT_FRACTION * n as f64).ceil() as usize).min(n);
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| robust[a].total_cmp(&robust[b]));
        let bulk = x.select(Axis(0), &order[..h]);

        let mean: Array1<f64> = bulk.mean_axis(Axis(0))?;
        let centred = &bulk - &mean;
        let cov: Array2<f64> = centred.t().dot(&centred) / h as f64;

        let precision = invert(&cov).or_else(|| {
            let ridge = 1e-6 * cov.diag().iter().map(|v| v.abs()).sum::<f64>().max(1.0);
            invert(&(&cov + &(Array2::<f64>::eye(d) * ridge)))
        })?;

        let raw: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|r| {
                let v = &r - &mean;
                v.dot(&precision.dot(&v))
            })
            .collect();

        let correction = median(&raw) / chi2_quantile(0.5, d);
        if !(correction > 0.0) || !correction.is_finite() {
            return Some(raw);
        }
        Some(raw.into_iter().map(|v| v / correction).collect())
    }
}

impl Detector for EllipticEnvelope {
    fn name(&self) -> &str {
        "one_class_envelope"
    }

    fn detect(&self, features: &FeatureMatrix) -> Labels {
        let Some(distances) = self.distances(features) else {
            return vec![0; features.rows()];
        };

        let cutoff = chi2_quantile(1.0 - self.nu, features.cols());
        distances.iter().map(|&v| u8::from(v > cutoff)).collect()
    }
}
