//! Helper functions for tree building algorithms.
//!
//! Split search sorts the node's samples once per feature and sweeps the
//! candidate thresholds left to right, updating running statistics in O(1)
//! per step.
//!
//! With a feature budget below the feature count, each node visits the
//! features in a random order and stops after the budget once a valid split
//! is known; a node whose sampled features are all constant keeps looking.

use super::MaxFeatures;
use crate::primitives::Matrix;
use rand::distributions::{Distribution, Uniform};
use rand::seq::SliceRandom;
use rand::Rng;

/// Best split found for one node.
#[derive(Debug, Clone)]
pub(super) struct SplitCandidate {
    pub feature_idx: usize,
    pub threshold: f64,
    /// Parent impurity minus children impurity, both weighted by sample count.
    pub impurity_decrease: f64,
}

// ============================================================================
// Impurity
// ============================================================================

/// Gini impurity from class counts.
///
/// Gini = 1 - Σ(p_i²)
pub(super) fn gini_from_counts(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

/// Sum of squared deviations from the mean of `y` at `indices`.
pub(super) fn sum_squared_error(y: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    let mean = mean_at(y, indices);
    indices.iter().map(|&i| (y[i] - mean).powi(2)).sum()
}

pub(super) fn mean_at(y: &[f64], indices: &[usize]) -> f64 {
    indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64
}

/// Class counts of `y` at `indices`.
pub(super) fn class_counts(y: &[usize], indices: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for &i in indices {
        counts[y[i]] += 1;
    }
    counts
}

/// Index of the most frequent class; ties go to the lower index.
pub(super) fn majority_class(counts: &[usize]) -> usize {
    counts
        .iter()
        .enumerate()
        .fold((0, 0), |(best, best_count), (class, &count)| {
            if count > best_count {
                (class, count)
            } else {
                (best, best_count)
            }
        })
        .0
}

// ============================================================================
// Split search
// ============================================================================

/// `indices` sorted by the value of `feature_idx`.
fn sorted_by_feature(x: &Matrix<f64>, indices: &[usize], feature_idx: usize) -> Vec<usize> {
    let mut order = indices.to_vec();
    order.sort_by(|&a, &b| x.get(a, feature_idx).total_cmp(&x.get(b, feature_idx)));
    order
}

/// Midpoint between two distinct sorted values that still separates them.
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid < hi {
        mid
    } else {
        lo
    }
}

/// Features a node inspects, in visiting order, and how many of them must be
/// visited before the search may stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct FeatureDraw {
    pub order: Vec<usize>,
    pub budget: usize,
}

impl FeatureDraw {
    /// Draws the visiting order for one node. Consumes no randomness when
    /// the budget covers every feature.
    pub fn draw<R: Rng>(n_features: usize, max_features: MaxFeatures, rng: &mut R) -> Self {
        let budget = max_features.resolve(n_features);
        let mut order: Vec<usize> = (0..n_features).collect();
        if budget < n_features {
            order.shuffle(rng);
        }
        Self { order, budget }
    }
}

/// Sweeps the drawn features, calling `child_cost(order, n_left)` with the
/// left side grown one sample at a time; keeps the cheapest valid threshold.
fn sweep_features<F>(
    x: &Matrix<f64>,
    indices: &[usize],
    features: &FeatureDraw,
    mut child_cost: F,
) -> Option<(usize, f64, f64)>
where
    F: FnMut(&[usize], usize) -> f64,
{
    let n = indices.len();
    let mut best: Option<(usize, f64, f64)> = None;

    for (visited, &feature_idx) in features.order.iter().enumerate() {
        if visited >= features.budget && best.is_some() {
            break;
        }
        let order = sorted_by_feature(x, indices, feature_idx);
        for n_left in 1..n {
            // Always advance the running statistics, even between tied values.
            let cost = child_cost(&order, n_left);
            let lo = x.get(order[n_left - 1], feature_idx);
            let hi = x.get(order[n_left], feature_idx);
            if lo >= hi {
                continue;
            }
            if best.as_ref().map_or(true, |&(_, _, c)| cost < c) {
                best = Some((feature_idx, midpoint(lo, hi), cost));
            }
        }
    }

    best
}

/// Best variance-reduction split for a regression node.
pub(super) fn best_regression_split(
    x: &Matrix<f64>,
    y: &[f64],
    indices: &[usize],
    features: &FeatureDraw,
) -> Option<SplitCandidate> {
    let n = indices.len();
    if n < 2 {
        return None;
    }
    let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
    let parent_sse = (total_sq - total_sum * total_sum / n as f64).max(0.0);

    let mut left_sum = 0.0;
    let mut left_sq = 0.0;
    let (feature_idx, threshold, child_sse) =
        sweep_features(x, indices, features, |order, n_left| {
            if n_left == 1 {
                left_sum = 0.0;
                left_sq = 0.0;
            }
            let v = y[order[n_left - 1]];
            left_sum += v;
            left_sq += v * v;

            let nl = n_left as f64;
            let nr = (n - n_left) as f64;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse_left = (left_sq - left_sum * left_sum / nl).max(0.0);
            let sse_right = (right_sq - right_sum * right_sum / nr).max(0.0);
            sse_left + sse_right
        })?;

    Some(SplitCandidate {
        feature_idx,
        threshold,
        impurity_decrease: (parent_sse - child_sse).max(0.0),
    })
}

/// Best Gini split for a classification node.
pub(super) fn best_gini_split(
    x: &Matrix<f64>,
    y: &[usize],
    indices: &[usize],
    n_classes: usize,
    features: &FeatureDraw,
) -> Option<SplitCandidate> {
    let n = indices.len();
    if n < 2 {
        return None;
    }
    let totals = class_counts(y, indices, n_classes);
    let total_sq: usize = totals.iter().map(|c| c * c).sum();
    let parent = n as f64 - total_sq as f64 / n as f64;

    let mut left = vec![0usize; n_classes];
    let mut right = totals.clone();
    let mut left_sq = 0usize;
    let mut right_sq = total_sq;

    let (feature_idx, threshold, child_gini) =
        sweep_features(x, indices, features, |order, n_left| {
            if n_left == 1 {
                left.iter_mut().for_each(|c| *c = 0);
                right.copy_from_slice(&totals);
                left_sq = 0;
                right_sq = total_sq;
            }
            let class = y[order[n_left - 1]];
            left_sq += 2 * left[class] + 1;
            left[class] += 1;
            right_sq -= 2 * right[class] - 1;
            right[class] -= 1;

            // n * gini = n - Σc²/n
            let nl = n_left as f64;
            let nr = (n - n_left) as f64;
            (nl - left_sq as f64 / nl) + (nr - right_sq as f64 / nr)
        })?;

    Some(SplitCandidate {
        feature_idx,
        threshold,
        impurity_decrease: (parent - child_gini).max(0.0),
    })
}

/// Splits `indices` into rows with `x[feature] <= threshold` and the rest.
pub(super) fn partition_by_threshold(
    x: &Matrix<f64>,
    indices: &[usize],
    feature_idx: usize,
    threshold: f64,
) -> (Vec<usize>, Vec<usize>) {
    indices
        .iter()
        .partition(|&&row| x.get(row, feature_idx) <= threshold)
}

/// Check if we've reached max depth.
pub(super) fn at_max_depth(depth: usize, max_depth: Option<usize>) -> bool {
    max_depth.is_some_and(|max_d| depth >= max_d)
}

// ============================================================================
// Bootstrap
// ============================================================================

/// Draws `n_samples` row indices with replacement.
pub(super) fn bootstrap_sample<R: Rng>(n_samples: usize, rng: &mut R) -> Vec<usize> {
    let dist = Uniform::from(0..n_samples);
    (0..n_samples).map(|_| dist.sample(rng)).collect()
}

/// Normalizes `values` in place to sum to 1.0 (no-op on an all-zero slice).
pub(super) fn normalize(values: &mut [f64]) {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        for v in values.iter_mut() {
            *v /= total;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn all_features(n: usize) -> FeatureDraw {
        FeatureDraw::draw(n, MaxFeatures::All, &mut StdRng::seed_from_u64(0))
    }

    #[test]
    fn test_gini_from_counts() {
        assert_eq!(gini_from_counts(&[4, 0, 0], 4), 0.0);
        assert!((gini_from_counts(&[2, 2], 4) - 0.5).abs() < 1e-12);
        assert_eq!(gini_from_counts(&[], 0), 0.0);
    }

    #[test]
    fn test_majority_class_tie_goes_low() {
        assert_eq!(majority_class(&[3, 5, 5]), 1);
        assert_eq!(majority_class(&[0, 0, 0]), 0);
    }

    #[test]
    fn test_regression_split_finds_step() {
        let x = Matrix::from_vec(6, 2, vec![
            1.0, 9.0, //
            2.0, 3.0, //
            3.0, 7.0, //
            4.0, 1.0, //
            5.0, 5.0, //
            6.0, 2.0,
        ])
        .expect("valid matrix");
        let y = [0.0, 0.0, 0.0, 10.0, 10.0, 10.0];
        let idx: Vec<usize> = (0..6).collect();
        let split = best_regression_split(&x, &y, &idx, &all_features(2)).expect("split exists");
        assert_eq!(split.feature_idx, 0);
        assert!((split.threshold - 3.5).abs() < 1e-12);
        assert!((split.impurity_decrease - sum_squared_error(&y, &idx)).abs() < 1e-9);
    }

    #[test]
    fn test_gini_split_separates_classes() {
        let x = Matrix::from_vec(4, 1, vec![0.1, 0.2, 0.8, 0.9]).expect("valid matrix");
        let y = [0, 0, 2, 2];
        let idx: Vec<usize> = (0..4).collect();
        let split = best_gini_split(&x, &y, &idx, 3, &all_features(1)).expect("split exists");
        assert!((split.threshold - 0.5).abs() < 1e-12);
        // parent n*gini = 4 * 0.5, children are pure
        assert!((split.impurity_decrease - 2.0).abs() < 1e-12);
        let (left, right) = partition_by_threshold(&x, &idx, 0, split.threshold);
        assert_eq!(left, vec![0, 1]);
        assert_eq!(right, vec![2, 3]);
    }

    #[test]
    fn test_no_split_on_constant_features() {
        let x = Matrix::from_vec(3, 1, vec![1.0, 1.0, 1.0]).expect("valid matrix");
        let idx = [0, 1, 2];
        let features = all_features(1);
        assert!(best_regression_split(&x, &[1.0, 2.0, 3.0], &idx, &features).is_none());
        assert!(best_gini_split(&x, &[0, 1, 0], &idx, 2, &features).is_none());
    }

    #[test]
    fn test_bootstrap_sample_seeded() {
        let sample = |seed| bootstrap_sample(50, &mut StdRng::seed_from_u64(seed));
        let a = sample(9);
        assert_eq!(a, sample(9));
        assert_ne!(a, sample(10));
        assert!(a.iter().all(|&i| i < 50));
    }

    #[test]
    fn test_feature_draw_budget() {
        let mut rng = StdRng::seed_from_u64(3);
        let full = FeatureDraw::draw(7, MaxFeatures::All, &mut rng);
        assert_eq!(full.order, (0..7).collect::<Vec<_>>());
        assert_eq!(full.budget, 7);

        let sqrt = FeatureDraw::draw(7, MaxFeatures::Sqrt, &mut rng);
        assert_eq!(sqrt.budget, 2);
        let mut sorted = sqrt.order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_subset_search_stops_after_budget() {
        // Feature 1 separates the classes; feature 0 only partially.
        let x = Matrix::from_vec(4, 2, vec![
            0.0, 0.0, //
            1.0, 0.0, //
            2.0, 1.0, //
            0.5, 1.0,
        ])
        .expect("valid matrix");
        let y = [0, 0, 1, 1];
        let idx = [0, 1, 2, 3];
        let only_first = FeatureDraw {
            order: vec![0, 1],
            budget: 1,
        };
        let split = best_gini_split(&x, &y, &idx, 2, &only_first).expect("split exists");
        assert_eq!(split.feature_idx, 0);

        let both = FeatureDraw {
            order: vec![0, 1],
            budget: 2,
        };
        let split = best_gini_split(&x, &y, &idx, 2, &both).expect("split exists");
        assert_eq!(split.feature_idx, 1);
    }

    #[test]
    fn test_subset_search_skips_constant_features() {
        let x = Matrix::from_vec(4, 2, vec![
            5.0, 0.0, //
            5.0, 1.0, //
            5.0, 2.0, //
            5.0, 3.0,
        ])
        .expect("valid matrix");
        let draw = FeatureDraw {
            order: vec![0, 1],
            budget: 1,
        };
        let split = best_gini_split(&x, &[0, 0, 1, 1], &[0, 1, 2, 3], 2, &draw)
            .expect("continues past the constant feature");
        assert_eq!(split.feature_idx, 1);
    }

    #[test]
    fn test_midpoint_adjacent_floats() {
        let lo = 1.0_f64;
        let hi = f64::from_bits(lo.to_bits() + 1);
        let mid = midpoint(lo, hi);
        assert!(mid >= lo && mid < hi);
    }
}
