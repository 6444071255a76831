use std::cmp::Ordering;

/// Two-sample Kolmogorov-Smirnov statistic: the largest absolute gap between
/// the empirical CDFs of `reference` and `live`.
///
/// Returns `0.0` when either sample is empty. NaN values are ignored.
pub fn ks_statistic(reference: &[f64], live: &[f64]) -> f64 {
    let reference = sorted_samples(reference);
    let live = sorted_samples(live);
    ks_statistic_sorted(&reference, &live)
}

/// Same as [`ks_statistic`] for inputs already sorted ascending.
pub fn ks_statistic_sorted(reference: &[f64], live: &[f64]) -> f64 {
    if reference.is_empty() || live.is_empty() {
        return 0.0;
    }
    let n = reference.len() as f64;
    let m = live.len() as f64;
    let (mut i, mut j) = (0usize, 0usize);
    let mut sup = 0.0f64;

    while i < reference.len() && j < live.len() {
        let x = reference[i].min(live[j]);
        // Step both ECDFs past every sample equal to x before comparing.
        while i < reference.len() && reference[i] <= x {
            i += 1;
        }
        while j < live.len() && live[j] <= x {
            j += 1;
        }
        sup = sup.max((i as f64 / n - j as f64 / m).abs());
    }
    // Once one side is exhausted its ECDF sits at 1; the gap only shrinks from here.
    sup.clamp(0.0, 1.0)
}

pub fn sorted_samples(values: &[f64]) -> Vec<f64> {
    let mut out = values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .collect::<Vec<_>>();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    out
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::drift::ks::ks_statistic;

    const INCOME: [f64; 5] = [5000.0, 4000.0, 7000.0, 3000.0, 8000.0];

    #[test]
    fn in_range_value_scores_low() {
        let score = ks_statistic(&INCOME, &[5000.0]);
        assert!((score - 0.4).abs() < 1e-12, "score was {score}");
    }

    #[test]
    fn far_out_value_scores_one() {
        assert_eq!(ks_statistic(&INCOME, &[500_000.0]), 1.0);
        assert_eq!(ks_statistic(&INCOME, &[-1.0]), 1.0);
    }

    #[test]
    fn identical_samples_score_zero() {
        let sample = (0..2_000).map(|i| (i as f64 * 0.37).sin()).collect::<Vec<_>>();
        assert_eq!(ks_statistic(&sample, &sample), 0.0);
    }

    #[test]
    fn handles_ties_across_samples() {
        let score = ks_statistic(&[1.0, 1.0, 2.0], &[1.0, 2.0, 2.0]);
        assert!((score - 1.0 / 3.0).abs() < 1e-12, "score was {score}");
    }

    #[test]
    fn empty_live_batch_scores_zero() {
        assert_eq!(ks_statistic(&INCOME, &[]), 0.0);
    }

    #[test]
    fn matches_reference_two_sample_value() {
        // D for these samples is 0.5: at x = 3, F_a = 0.75 and F_b = 0.25.
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [3.5, 4.5, 5.5, 2.5];
        assert!((ks_statistic(&a, &b) - 0.5).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn statistic_is_bounded(
            reference in prop::collection::vec(-1e6f64..1e6, 1..200),
            live in prop::collection::vec(-1e6f64..1e6, 0..50),
        ) {
            let score = ks_statistic(&reference, &live);
            prop_assert!((0.0..=1.0).contains(&score), "score out of range: {score}");
        }

        #[test]
        fn shifted_batch_separates_further(
            reference in prop::collection::vec(0.0f64..100.0, 20..200),
        ) {
            let matching = reference.iter().step_by(2).copied().collect::<Vec<_>>();
            let shifted = matching.iter().map(|v| v + 1_000.0).collect::<Vec<_>>();
            let near = ks_statistic(&reference, &matching);
            let far = ks_statistic(&reference, &shifted);
            prop_assert!(far > near, "far {far} should exceed near {near}");
            prop_assert_eq!(far, 1.0);
        }
    }
}
