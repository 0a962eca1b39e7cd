//! Seeded train/test partitioning.
//!
//! The split is expressed as a pair of index lists so a single permutation can
//! partition several aligned targets (features, demand, risk) identically.

use crate::error::{Result, VaxError};
use crate::primitives::{Matrix, Vector};
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices of a train/test partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    /// Rows assigned to training
    pub train: Vec<usize>,
    /// Rows held out for evaluation
    pub test: Vec<usize>,
}

impl SplitIndices {
    /// Number of training rows.
    #[must_use]
    pub fn n_train(&self) -> usize {
        self.train.len()
    }

    /// Number of held-out rows.
    #[must_use]
    pub fn n_test(&self) -> usize {
        self.test.len()
    }
}

fn validate_split_inputs(n_samples: usize, test_size: f64) -> Result<(usize, usize)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(VaxError::InvalidHyperparameter {
            param: "test_size".to_string(),
            value: test_size.to_string(),
            constraint: "0 < test_size < 1".to_string(),
        });
    }

    let n_test = held_out_rows(n_samples, test_size);
    let n_train = n_samples.saturating_sub(n_test);

    if n_test == 0 || n_train == 0 {
        return Err(VaxError::InsufficientData {
            context: format!("train/test split with test_size={test_size}"),
            required: minimum_rows(test_size),
            actual: n_samples,
        });
    }

    Ok((n_train, n_test))
}

/// `ceil(n_samples * test_size)`: any nonzero fraction holds out a row.
fn held_out_rows(n_samples: usize, test_size: f64) -> usize {
    (n_samples as f64 * test_size).ceil() as usize
}

/// Smallest row count that leaves at least one row on each side.
fn minimum_rows(test_size: f64) -> usize {
    (2..)
        .find(|&n| {
            let n_test = held_out_rows(n, test_size);
            n_test > 0 && n_test < n
        })
        .unwrap_or(2)
}

/// Shuffles `0..n_samples` with a seeded RNG.
fn shuffle_indices(n_samples: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    indices
}

/// Partitions `n_samples` rows into train and test indices.
///
/// `n_test = ceil(n_samples * test_size)`. The same seed always yields the
/// same partition.
///
/// # Errors
///
/// Returns `InvalidHyperparameter` if `test_size` is outside (0, 1) and
/// `InsufficientData` if either side of the split would be empty.
///
/// # Examples
///
/// ```
/// use vaxflow::model_selection::split_indices;
///
/// let split = split_indices(10, 0.2, 42).unwrap();
/// assert_eq!(split.n_train(), 8);
/// assert_eq!(split.n_test(), 2);
/// ```
pub fn split_indices(n_samples: usize, test_size: f64, seed: u64) -> Result<SplitIndices> {
    let (n_train, _) = validate_split_inputs(n_samples, test_size)?;
    let mut indices = shuffle_indices(n_samples, seed);
    let test = indices.split_off(n_train);
    Ok(SplitIndices {
        train: indices,
        test,
    })
}

/// Splits a feature matrix and aligned target into train and test sets.
///
/// Returns `(x_train, x_test, y_train, y_test)`.
///
/// # Errors
///
/// Returns a schema error when `x` and `y` disagree on row count, otherwise
/// the errors of [`split_indices`].
#[allow(clippy::type_complexity)]
pub fn train_test_split(
    x: &Matrix<f64>,
    y: &Vector<f64>,
    test_size: f64,
    seed: u64,
) -> Result<(Matrix<f64>, Matrix<f64>, Vector<f64>, Vector<f64>)> {
    if x.n_rows() != y.len() {
        return Err(VaxError::Schema {
            field: "target".to_string(),
            reason: format!("has {} rows, features have {}", y.len(), x.n_rows()),
        });
    }
    let split = split_indices(x.n_rows(), test_size, seed)?;
    Ok((
        x.select_rows(&split.train),
        x.select_rows(&split.test),
        y.select(&split.train),
        y.select(&split.test),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes() {
        let split = split_indices(100, 0.2, 42).expect("valid split");
        assert_eq!(split.n_train(), 80);
        assert_eq!(split.n_test(), 20);
    }

    #[test]
    fn test_split_is_partition() {
        let split = split_indices(37, 0.3, 7).expect("valid split");
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..37).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_reproducible() {
        let a = split_indices(50, 0.2, 42).expect("valid split");
        let b = split_indices(50, 0.2, 42).expect("valid split");
        let c = split_indices(50, 0.2, 43).expect("valid split");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_split_rounds_test_side_up() {
        let split = split_indices(2, 0.2, 42).expect("one row each side");
        assert_eq!((split.n_train(), split.n_test()), (1, 1));

        let split = split_indices(37, 0.3, 7).expect("valid split");
        assert_eq!((split.n_train(), split.n_test()), (25, 12));
    }

    #[test]
    fn test_split_too_small() {
        let err = split_indices(1, 0.2, 42).expect_err("one row cannot be split");
        match err {
            VaxError::InsufficientData {
                required, actual, ..
            } => {
                assert_eq!(actual, 1);
                assert_eq!(required, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(split_indices(0, 0.2, 42).is_err());
        // ceil(2 * 0.99) = 2 leaves nothing to train on
        assert!(split_indices(2, 0.99, 42).is_err());
    }

    #[test]
    fn test_invalid_test_size() {
        assert!(matches!(
            split_indices(10, 0.0, 1),
            Err(VaxError::InvalidHyperparameter { .. })
        ));
        assert!(split_indices(10, 1.0, 1).is_err());
        assert!(split_indices(10, f64::NAN, 1).is_err());
    }

    #[test]
    fn test_train_test_split_aligned() {
        let x = Matrix::from_vec(10, 1, (0..10).map(f64::from).collect()).expect("valid");
        let y = Vector::from_vec((0..10).map(|v| f64::from(v) * 10.0).collect());
        let (x_train, x_test, y_train, y_test) =
            train_test_split(&x, &y, 0.3, 42).expect("valid split");
        assert_eq!(x_train.n_rows(), 7);
        assert_eq!(x_test.n_rows(), 3);
        for i in 0..x_test.n_rows() {
            assert_eq!(x_test.get(i, 0) * 10.0, y_test[i]);
        }
        for i in 0..x_train.n_rows() {
            assert_eq!(x_train.get(i, 0) * 10.0, y_train[i]);
        }
    }

    #[test]
    fn test_train_test_split_row_mismatch() {
        let x = Matrix::zeros(4, 2);
        let y = Vector::from_slice(&[1.0, 2.0]);
        assert!(train_test_split(&x, &y, 0.5, 0).expect_err("mismatch").is_schema());
    }
}
