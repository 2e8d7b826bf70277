//! Weighted random choice over dynamic candidate sets.
//!
//! These functions take plain weight slices and a uniform draw so they can
//! be tested without any domain types or RNG.

/// Pick an index with probability proportional to `weights[i]`.
///
/// `u` is a uniform draw in `[0, 1)`. Returns `None` when the weights are
/// empty, contain a negative or non-finite entry, or sum to zero.
/// Zero-weight entries are never chosen.
pub fn choose_weighted(weights: &[f64], u: f64) -> Option<usize> {
    let total = checked_total(weights)?;
    let target = u.clamp(0.0, 1.0) * total;
    let mut cumulative = 0.0;
    let mut last_positive = None;
    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        cumulative += w;
        last_positive = Some(i);
        if target < cumulative {
            return Some(i);
        }
    }
    // Rounding can leave `target` at the very top of the range.
    last_positive
}

/// Scale `weights` to a probability distribution summing to 1.
///
/// Returns `None` under the same conditions as [`choose_weighted`].
pub fn normalize_weights(weights: &[f64]) -> Option<Vec<f64>> {
    let total = checked_total(weights)?;
    Some(weights.iter().map(|w| w / total).collect())
}

fn checked_total(weights: &[f64]) -> Option<f64> {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return None;
    }
    let total: f64 = weights.iter().sum();
    (total > 0.0 && total.is_finite()).then_some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn degenerate_inputs_yield_none() {
        assert_eq!(choose_weighted(&[], 0.5), None);
        assert_eq!(choose_weighted(&[0.0, 0.0], 0.5), None);
        assert_eq!(choose_weighted(&[1.0, -1.0], 0.5), None);
        assert_eq!(choose_weighted(&[f64::NAN], 0.5), None);
        assert_eq!(normalize_weights(&[0.0]), None);
    }

    #[test]
    fn cumulative_boundaries() {
        let w = [1.0, 3.0];
        assert_eq!(choose_weighted(&w, 0.0), Some(0));
        assert_eq!(choose_weighted(&w, 0.249), Some(0));
        assert_eq!(choose_weighted(&w, 0.25), Some(1));
        assert_eq!(choose_weighted(&w, 0.999_999), Some(1));
    }

    #[test]
    fn zero_weights_are_skipped() {
        let w = [0.0, 2.0, 0.0];
        for u in [0.0, 0.3, 0.99, 1.0] {
            assert_eq!(choose_weighted(&w, u), Some(1));
        }
    }

    proptest! {
        #[test]
        fn normalized_sums_to_one(w in prop::collection::vec(0.0f64..100.0, 1..16)) {
            prop_assume!(w.iter().sum::<f64>() > 0.0);
            let p = normalize_weights(&w).unwrap();
            prop_assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }

        #[test]
        fn chosen_index_has_positive_weight(
            w in prop::collection::vec(0.0f64..10.0, 1..16),
            u in 0.0f64..1.0,
        ) {
            prop_assume!(w.iter().sum::<f64>() > 0.0);
            let i = choose_weighted(&w, u).unwrap();
            prop_assert!(w[i] > 0.0);
        }
    }
}
