//! Numeric helpers shared by the detectors

use ndarray::Array2;

/// Linear-interpolated percentile, `q` in [0, 100]. NaN for empty input.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

/// Flag values strictly above the `(1 - fraction)` percentile
pub fn flag_upper_tail(scores: &[f64], fraction: f64) -> Vec<u8> {
    let threshold = percentile(scores, 100.0 * (1.0 - fraction));
    scores.iter().map(|&s| u8::from(s > threshold)).collect()
}

/// Standard normal quantile (Acklam's rational approximation)
pub fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

/// Chi-squared quantile with `k` degrees of freedom (Wilson-Hilferty)
pub fn chi2_quantile(p: f64, k: usize) -> f64 {
    let k = k.max(1) as f64;
    let t = 2.0 / (9.0 * k);
    let base = 1.0 - t + normal_quantile(p) * t.sqrt();
    k * base.max(0.0).powi(3)
}

/// Gauss-Jordan inverse with partial pivoting. `None` if singular.
pub fn invert(matrix: &Array2<f64>) -> Option<Array2<f64>> {
    let n = matrix.nrows();
    if n == 0 || matrix.ncols() != n {
        return None;
    }

    let mut a = matrix.clone();
    let mut inv = Array2::<f64>::eye(n);
    let scale = matrix.iter().fold(0.0f64, |m, v| m.max(v.abs())).max(1.0);

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))?;
        if a[[pivot, col]].abs() <= 1e-12 * scale {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                a.swap([pivot, k], [col, k]);
                inv.swap([pivot, k], [col, k]);
            }
        }

        let diag = a[[col, col]];
        for k in 0..n {
            a[[col, k]] /= diag;
            inv[[col, k]] /= diag;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for k in 0..n {
                a[[row, k]] -= factor * a[[col, k]];
                inv[[row, k]] -= factor * inv[[col, k]];
            }
        }
    }

    Some(inv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_percentile_interpolates() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_abs_diff_eq!(percentile(&values, 0.0), 1.0);
        assert_abs_diff_eq!(percentile(&values, 100.0), 4.0);
        assert_abs_diff_eq!(percentile(&values, 50.0), 2.5);
        assert_abs_diff_eq!(percentile(&values, 99.0), 3.97, epsilon = 1e-12);
        assert!(percentile(&[], 50.0).is_nan());
    }

    #[test]
    fn test_flag_upper_tail() {
        let scores: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let flags = flag_upper_tail(&scores, 0.01);
        assert_eq!(flags.iter().map(|&f| f as usize).sum::<usize>(), 1);
        assert_eq!(flags[99], 1);

        // Constant scores: nothing is strictly above
        assert!(flag_upper_tail(&[1.0; 10], 0.1).iter().all(|&f| f == 0));
    }

    #[test]
    fn test_quantiles() {
        assert_abs_diff_eq!(normal_quantile(0.5), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(normal_quantile(0.975), 1.959964, epsilon = 1e-4);
        assert_abs_diff_eq!(normal_quantile(0.01), -2.326348, epsilon = 1e-4);
        assert_abs_diff_eq!(chi2_quantile(0.99, 2), 9.2103, epsilon = 0.1);
        assert_abs_diff_eq!(chi2_quantile(0.5, 2), 1.3863, epsilon = 0.05);
    }

    #[test]
    fn test_invert() {
        let m = array![[4.0, 7.0], [2.0, 6.0]];
        let inv = invert(&m).unwrap();
        let product = m.dot(&inv);
        for ((i, j), v) in product.indexed_iter() {
            assert_abs_diff_eq!(*v, if i == j { 1.0 } else { 0.0 }, epsilon = 1e-12);
        }

        assert!(invert(&array![[1.0, 2.0], [2.0, 4.0]]).is_none());
    }
}
