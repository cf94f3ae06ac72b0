//! Standard Scaler
//!
//! Zero mean, unit variance per column. The reference statistics come from
//! the current batch (`BaselineScope::Batch`) or from running statistics
//! accumulated over every batch seen so far (`BaselineScope::Global`).
//! Global statistics can be persisted as a versioned snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::layout::{layout_hash, validate_layout, FEATURE_COUNT, FEATURE_VERSION};
use super::matrix::FeatureMatrix;
use crate::logic::config::{BaselineConfig, BaselineScope};
use crate::logic::error::BaselineError;

// ============================================================================
// RUNNING STATISTICS (Welford)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    pub count: u64,
    pub mean: Vec<f64>,
    /// Sum of squared deviations from the mean
    pub m2: Vec<f64>,
}

impl RunningStats {
    pub fn new(width: usize) -> Self {
        Self { count: 0, mean: vec![0.0; width], m2: vec![0.0; width] }
    }

    pub fn from_matrix(matrix: &FeatureMatrix) -> Self {
        let mut stats = Self::new(matrix.cols());
        stats.update(matrix);
        stats
    }

    pub fn update(&mut self, matrix: &FeatureMatrix) {
        if matrix.cols() != self.mean.len() {
            log::warn!(
                "Baseline width {} does not match batch width {}, resetting",
                self.mean.len(),
                matrix.cols()
            );
            *self = Self::new(matrix.cols());
        }

        for row in matrix.array().rows() {
            self.count += 1;
            let n = self.count as f64;
            for (j, &x) in row.iter().enumerate() {
                let delta = x - self.mean[j];
                self.mean[j] += delta / n;
                self.m2[j] += delta * (x - self.mean[j]);
            }
        }
    }

    /// Population standard deviation per column
    pub fn std_dev(&self) -> Vec<f64> {
        if self.count == 0 {
            return vec![0.0; self.mean.len()];
        }
        self.m2.iter().map(|m2| (m2 / self.count as f64).max(0.0).sqrt()).collect()
    }

    pub fn transform(&self, matrix: &FeatureMatrix) -> FeatureMatrix {
        let std = self.std_dev();
        let mut out = Array2::zeros((matrix.rows(), matrix.cols()));

        for ((i, j), &x) in matrix.array().indexed_iter() {
            let (mean, sd) = (self.mean.get(j).copied().unwrap_or(0.0), std.get(j).copied().unwrap_or(0.0));
            // Constant column carries no information
            out[[i, j]] = if sd > f64::EPSILON { (x - mean) / sd } else { 0.0 };
        }

        FeatureMatrix::from_array(out)
    }
}

// ============================================================================
// BASELINE SNAPSHOT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineSnapshot {
    pub feature_version: u8,
    pub layout_hash: u32,
    pub stats: RunningStats,
    pub updated_at: i64,
}

impl BaselineSnapshot {
    pub fn new(stats: RunningStats) -> Self {
        Self {
            feature_version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            stats,
            updated_at: Utc::now().timestamp(),
        }
    }
}

pub fn save_baseline(snapshot: &BaselineSnapshot, path: &Path) -> Result<(), BaselineError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_vec_pretty(snapshot)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load and validate against the current feature layout
pub fn load_baseline(path: &Path) -> Result<BaselineSnapshot, BaselineError> {
    let data = fs::read(path)?;
    let snapshot: BaselineSnapshot = serde_json::from_slice(&data)?;

    validate_layout(snapshot.feature_version, snapshot.layout_hash)?;

    Ok(snapshot)
}

// ============================================================================
// SCALER
// ============================================================================

pub struct StandardScaler {
    scope: BaselineScope,
    path: Option<PathBuf>,
    global: RunningStats,
}

impl StandardScaler {
    /// A global scaler resumes from `config.path` when a compatible
    /// snapshot exists there.
    pub fn new(config: &BaselineConfig) -> Self {
        let mut global = RunningStats::new(FEATURE_COUNT);

        if config.scope == BaselineScope::Global {
            if let Some(path) = config.path.as_deref().filter(|p| p.exists()) {
                match load_baseline(path) {
                    Ok(snapshot) => {
                        log::info!(
                            "Loaded baseline from {} ({} samples)",
                            path.display(),
                            snapshot.stats.count
                        );
                        global = snapshot.stats;
                    }
                    Err(e) => log::warn!("Ignoring baseline at {}: {}", path.display(), e),
                }
            }
        }

        Self {
            scope: config.scope,
            path: config.path.clone(),
            global,
        }
    }

    /// Standardize a batch according to the configured scope
    pub fn fit_transform(&mut self, raw: &FeatureMatrix) -> FeatureMatrix {
        match self.scope {
            BaselineScope::Batch => RunningStats::from_matrix(raw).transform(raw),
            BaselineScope::Global => {
                self.global.update(raw);
                self.global.transform(raw)
            }
        }
    }

    pub fn global_stats(&self) -> &RunningStats {
        &self.global
    }

    /// Write the global baseline if one is configured
    pub fn persist(&self) -> Result<(), BaselineError> {
        match (&self.scope, &self.path) {
            (BaselineScope::Global, Some(path)) => {
                save_baseline(&BaselineSnapshot::new(self.global.clone()), path)?;
                log::info!("Baseline saved to {}", path.display());
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn matrix(rows: &[[f64; 2]]) -> FeatureMatrix {
        let rows: Vec<Vec<f64>> = rows.iter().map(|r| r.to_vec()).collect();
        FeatureMatrix::from_rows(&rows).unwrap()
    }

    fn column(m: &FeatureMatrix, j: usize) -> Vec<f64> {
        m.array().column(j).to_vec()
    }

    #[test]
    fn test_batch_standardization() {
        let raw = matrix(&[[1.0, 10.0], [2.0, 10.0], [3.0, 10.0]]);
        let mut scaler = StandardScaler::new(&BaselineConfig::default());

        let z = scaler.fit_transform(&raw);
        let cpu = column(&z, 0);
        assert_abs_diff_eq!(cpu.iter().sum::<f64>(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(cpu[2], 1.224744871391589, epsilon = 1e-9);
        // Constant column maps to zero
        assert_eq!(column(&z, 1), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_batch_scope_forgets() {
        let mut scaler = StandardScaler::new(&BaselineConfig::default());
        scaler.fit_transform(&matrix(&[[100.0, 1.0], [200.0, 2.0]]));

        let z = scaler.fit_transform(&matrix(&[[1.0, 1.0], [3.0, 3.0]]));
        assert_abs_diff_eq!(z.array()[[0, 0]], -1.0, epsilon = 1e-12);
        assert_eq!(scaler.global_stats().count, 0);
    }

    #[test]
    fn test_global_scope_accumulates() {
        let config = BaselineConfig { scope: BaselineScope::Global, path: None };
        let mut scaler = StandardScaler::new(&config);

        scaler.fit_transform(&matrix(&[[0.0, 0.0], [2.0, 2.0]]));
        let z = scaler.fit_transform(&matrix(&[[4.0, 4.0], [6.0, 6.0]]));

        let stats = scaler.global_stats();
        assert_eq!(stats.count, 4);
        assert_abs_diff_eq!(stats.mean[0], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.std_dev()[0], 5.0f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(z.array()[[0, 0]], 1.0 / 5.0f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_baseline_save_load_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        let config = BaselineConfig { scope: BaselineScope::Global, path: Some(path.clone()) };

        let mut scaler = StandardScaler::new(&config);
        scaler.fit_transform(&matrix(&[[1.0, 5.0], [3.0, 7.0]]));
        scaler.persist().unwrap();

        let resumed = StandardScaler::new(&config);
        assert_eq!(resumed.global_stats(), scaler.global_stats());
    }

    #[test]
    fn test_reject_layout_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.json");

        let mut snapshot = BaselineSnapshot::new(RunningStats::new(FEATURE_COUNT));
        snapshot.stats.count = 9;
        snapshot.feature_version = FEATURE_VERSION + 1;
        save_baseline(&snapshot, &path).unwrap();

        match load_baseline(&path) {
            Err(BaselineError::LayoutMismatch { expected_version, actual_version, .. }) => {
                assert_eq!(expected_version, FEATURE_VERSION);
                assert_eq!(actual_version, FEATURE_VERSION + 1);
            }
            _ => panic!("Expected LayoutMismatch error"),
        }

        // Incompatible snapshot is ignored, not fatal
        let config = BaselineConfig { scope: BaselineScope::Global, path: Some(path) };
        assert_eq!(StandardScaler::new(&config).global_stats().count, 0);
    }
}
