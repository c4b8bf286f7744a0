//! Conversion of log-importance-weights into normalized linear weights.

use ndarray::prelude::*;

use crate::error::{Result, VizError};

/// Turns optional log-weights for `n` samples into non-negative weights that sum to one.
///
/// Without log-weights every sample gets `1 / n`. With log-weights, `w_i = exp(logw_i)` is
/// renormalized by `sum_j w_j`. The exponent is shifted by the largest log-weight first, which
/// leaves the normalized result unchanged but keeps very negative log-weights from underflowing.
///
/// Returns [`VizError::DegenerateWeights`] when there is no usable mass: every log-weight is `-inf`,
/// one of them is NaN or `+inf`, or `n` is zero.
///
/// # Examples
///
/// ```rust
/// use infer_viz::weights::normalize_log_weights;
///
/// let w = normalize_log_weights(Some(&[0.0, 0.0, 2.0_f64.ln()]), 3)?;
/// assert!((w.sum() - 1.0).abs() < 1e-12);
/// assert!((w[2] - 0.5).abs() < 1e-12);
/// # Ok::<(), infer_viz::error::VizError>(())
/// ```
pub fn normalize_log_weights(log_weights: Option<&[f64]>, n: usize) -> Result<Array1<f64>> {
    if n == 0 {
        return Err(VizError::DegenerateWeights("no samples to weight".into()));
    }
    let log_weights = match log_weights {
        None => return Ok(Array1::from_elem(n, 1.0 / n as f64)),
        Some(lw) => lw,
    };
    if log_weights.len() != n {
        return Err(VizError::MalformedDataset(format!(
            "{} log-weights for {} samples",
            log_weights.len(),
            n
        )));
    }
    if let Some(bad) = log_weights.iter().find(|lw| lw.is_nan() || **lw == f64::INFINITY) {
        return Err(VizError::DegenerateWeights(format!(
            "log-weight {bad} cannot be normalized"
        )));
    }

    let max = log_weights
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return Err(VizError::DegenerateWeights(
            "every sample has zero weight".into(),
        ));
    }

    let weights = Array1::from_iter(log_weights.iter().map(|lw| (lw - max).exp()));
    let total = weights.sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(VizError::DegenerateWeights(format!(
            "weights sum to {total}"
        )));
    }
    Ok(weights / total)
}

/// Kish's effective sample size `1 / sum_i w_i^2` of normalized weights.
///
/// Equals `n` for uniform weights and approaches 1 when a single sample carries all the mass.
pub fn effective_sample_size(weights: ArrayView1<f64>) -> f64 {
    let sum_sq = weights.mapv(|w| w * w).sum();
    if sum_sq > 0.0 {
        1.0 / sum_sq
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_unweighted_is_uniform() {
        let w = normalize_log_weights(None, 4).unwrap();
        assert_eq!(w, array![0.25, 0.25, 0.25, 0.25]);
    }

    #[test]
    fn test_renormalizes_exponentiated_weights() {
        let lw = [-0.2, -0.1, -0.5];
        let w = normalize_log_weights(Some(&lw), 3).unwrap();
        let raw: Vec<f64> = lw.iter().map(|x: &f64| x.exp()).collect();
        let total: f64 = raw.iter().sum();
        for (got, expected) in w.iter().zip(raw.iter()) {
            assert_abs_diff_eq!(*got, expected / total, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_very_negative_log_weights_survive() {
        let w = normalize_log_weights(Some(&[-1000.0, -1000.0 + 3.0_f64.ln()]), 2).unwrap();
        assert_abs_diff_eq!(w[0], 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(w[1], 0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_partial_zero_weights() {
        let w = normalize_log_weights(Some(&[f64::NEG_INFINITY, 0.0]), 2).unwrap();
        assert_eq!(w, array![0.0, 1.0]);
    }

    #[test]
    fn test_all_zero_weights_are_degenerate() {
        let lw = [f64::NEG_INFINITY; 3];
        let err = normalize_log_weights(Some(&lw), 3).unwrap_err();
        assert!(matches!(err, VizError::DegenerateWeights(_)), "{err}");
    }

    #[test]
    fn test_nan_and_infinite_weights_are_degenerate() {
        assert!(matches!(
            normalize_log_weights(Some(&[0.0, f64::NAN]), 2),
            Err(VizError::DegenerateWeights(_))
        ));
        assert!(matches!(
            normalize_log_weights(Some(&[f64::INFINITY, 0.0]), 2),
            Err(VizError::DegenerateWeights(_))
        ));
    }

    #[test]
    fn test_length_mismatch_is_malformed() {
        assert!(matches!(
            normalize_log_weights(Some(&[0.0]), 2),
            Err(VizError::MalformedDataset(_))
        ));
    }

    #[test]
    fn test_weights_are_non_negative_and_sum_to_one() {
        let lw: Vec<f64> = (0..50).map(|i| ((i * 37) % 11) as f64 * -0.7 + 3.0).collect();
        let w = normalize_log_weights(Some(&lw), lw.len()).unwrap();
        assert!(w.iter().all(|&x| x >= 0.0));
        assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_effective_sample_size() {
        let uniform = normalize_log_weights(None, 8).unwrap();
        assert_abs_diff_eq!(effective_sample_size(uniform.view()), 8.0, epsilon = 1e-9);
        let peaked = array![1.0, 0.0, 0.0];
        assert_abs_diff_eq!(effective_sample_size(peaked.view()), 1.0);
    }
}
