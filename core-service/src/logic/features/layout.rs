//! Feature Layout
//!
//! Column order of the feature matrix. Persisted baselines carry the
//! version and a CRC32 of this layout.
//!
//! Any change to `FEATURE_LAYOUT` (new column, removed column, reordering)
//! bumps `FEATURE_VERSION`, which invalidates saved baselines.

use crc32fast::Hasher;

use crate::logic::error::BaselineError;

/// Current feature layout version
pub const FEATURE_VERSION: u8 = 1;

/// Feature names in exact column order
pub const FEATURE_LAYOUT: &[&str] = &[
    "cpu_usage", // 0: percent
    "latency",   // 1: ms
];

/// Must match FEATURE_LAYOUT.len()
pub const FEATURE_COUNT: usize = 2;

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// CRC32 over version and feature names
pub fn layout_hash() -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[FEATURE_VERSION]);

    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }

    hasher.finalize()
}

/// Reject statistics produced under another layout
pub fn validate_layout(version: u8, hash: u32) -> Result<(), BaselineError> {
    let current_hash = layout_hash();

    if version != FEATURE_VERSION || hash != current_hash {
        return Err(BaselineError::LayoutMismatch {
            expected_version: FEATURE_VERSION,
            actual_version: version,
            expected_hash: current_hash,
            actual_hash: hash,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_count() {
        assert_eq!(FEATURE_LAYOUT.len(), FEATURE_COUNT);
        assert_eq!(FEATURE_LAYOUT[1], "latency");
    }

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(layout_hash(), layout_hash());
        assert_ne!(layout_hash(), 0);
    }

    #[test]
    fn test_validate_layout() {
        assert!(validate_layout(FEATURE_VERSION, layout_hash()).is_ok());
        assert!(validate_layout(FEATURE_VERSION + 1, layout_hash()).is_err());
        assert!(validate_layout(FEATURE_VERSION, !layout_hash()).is_err());
    }
}
