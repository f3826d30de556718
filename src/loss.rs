//! Softmax and cross-entropy.
//!
//! These are the numeric pieces shared by batched training, single-sample
//! inference and the CPU evaluation of the field shader.

/// Probability floor inside `log` so a confidently wrong prediction yields a
/// large but finite loss.
pub const PROB_FLOOR: f32 = 1e-6;

/// Numerically stable softmax.
///
/// Subtracts the largest logit before exponentiating. Returns `false` and writes a
/// uniform distribution into `probs` when the denominator is not a positive finite
/// number (non-finite logits).
#[inline]
pub fn softmax(logits: &[f32], probs: &mut [f32]) -> bool {
    assert_eq!(
        logits.len(),
        probs.len(),
        "logits len {} does not match probs len {}",
        logits.len(),
        probs.len()
    );
    assert!(!logits.is_empty(), "softmax requires at least 1 class");

    let mut max_logit = f32::NEG_INFINITY;
    for &z in logits {
        if z > max_logit {
            max_logit = z;
        }
    }

    let mut exp_sum = 0.0_f32;
    for (p, &z) in probs.iter_mut().zip(logits) {
        let e = (z - max_logit).exp();
        *p = e;
        exp_sum += e;
    }

    if !(exp_sum > 0.0 && exp_sum.is_finite()) {
        probs.fill(1.0 / probs.len() as f32);
        return false;
    }

    for p in probs.iter_mut() {
        *p /= exp_sum;
    }
    true
}

/// Cross-entropy of a single sample given the probability assigned to its true class.
#[inline]
pub fn cross_entropy(prob_true: f32) -> f32 {
    -prob_true.max(PROB_FLOOR).ln()
}

/// Index of the largest value. Ties resolve to the lowest index.
#[inline]
pub fn argmax(xs: &[f32]) -> usize {
    let mut best = 0;
    let mut best_val = f32::NEG_INFINITY;
    for (i, &x) in xs.iter().enumerate() {
        if x > best_val {
            best_val = x;
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    #[test]
    fn softmax_is_stable_for_huge_logits() {
        let mut p = [0.0_f32; 2];
        assert!(softmax(&[1000.0, 999.0], &mut p));
        assert!(p.iter().all(|v| v.is_finite()));
        assert_abs_diff_eq!(p[0] + p[1], 1.0, epsilon = 1e-6);
        assert!(p[0] > p[1]);
    }

    #[test]
    fn softmax_falls_back_to_uniform_on_nan() {
        let mut p = [0.0_f32; 2];
        assert!(!softmax(&[f32::NAN, 0.0], &mut p));
        assert_eq!(p, [0.5, 0.5]);

        assert!(!softmax(&[f32::INFINITY, f32::INFINITY], &mut p));
        assert_eq!(p, [0.5, 0.5]);
    }

    #[test]
    fn cross_entropy_is_floored() {
        assert_abs_diff_eq!(cross_entropy(1.0), 0.0);
        assert_abs_diff_eq!(cross_entropy(0.0), -(PROB_FLOOR.ln()), epsilon = 1e-4);
        assert_abs_diff_eq!(cross_entropy(0.5), std::f32::consts::LN_2, epsilon = 1e-6);
    }

    #[test]
    fn argmax_prefers_first_on_ties() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.2, 0.8]), 1);
    }
}
