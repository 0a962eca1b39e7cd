//! Feature preprocessing: standardization and canonical feature ordering.
//!
//! # Example
//!
//! ```
//! use vaxflow::prelude::*;
//! use vaxflow::preprocessing::StandardScaler;
//!
//! let data = Matrix::from_vec(4, 2, vec![
//!     1.0, 100.0,
//!     2.0, 200.0,
//!     3.0, 300.0,
//!     4.0, 400.0,
//! ]).expect("valid matrix dimensions");
//!
//! let mut scaler = StandardScaler::new();
//! let scaled = scaler.fit_transform(&data).expect("fit_transform should succeed");
//! assert!(scaled.get(0, 0) < 0.0);
//! ```

mod processor;

pub use processor::FeatureProcessor;

use crate::error::{Result, VaxError};
use crate::primitives::Matrix;
use crate::traits::Transformer;
use serde::{Deserialize, Serialize};

/// Standard deviations at or below this are treated as zero variance.
const DEGENERATE_STD: f64 = 1e-12;

/// Standardizes features by removing mean and scaling to unit variance.
///
/// The standard score of a sample x is: z = (x - mean) / std, with the
/// population standard deviation. A zero-variance column cannot be scaled and
/// is rejected at fit time.
///
/// # Example
///
/// ```
/// use vaxflow::prelude::*;
/// use vaxflow::preprocessing::StandardScaler;
///
/// let data = Matrix::from_vec(3, 2, vec![
///     0.0, 0.0,
///     1.0, 10.0,
///     2.0, 20.0,
/// ]).expect("valid matrix dimensions");
///
/// let mut scaler = StandardScaler::new();
/// let scaled = scaler.fit_transform(&data).expect("fit_transform should succeed");
///
/// for j in 0..2 {
///     let mean: f64 = (0..3).map(|i| scaled.get(i, j)).sum::<f64>() / 3.0;
///     assert!(mean.abs() < 1e-12);
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Mean of each feature (computed during fit).
    mean: Option<Vec<f64>>,
    /// Standard deviation of each feature (computed during fit).
    std: Option<Vec<f64>>,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardScaler {
    /// Creates an unfitted scaler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mean: None,
            std: None,
        }
    }

    /// Returns the mean of each feature, or `None` before fit.
    #[must_use]
    pub fn mean(&self) -> Option<&[f64]> {
        self.mean.as_deref()
    }

    /// Returns the standard deviation of each feature, or `None` before fit.
    #[must_use]
    pub fn std(&self) -> Option<&[f64]> {
        self.std.as_deref()
    }

    /// Returns true if the scaler has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }

    /// Number of features seen during fit.
    #[must_use]
    pub fn n_features(&self) -> Option<usize> {
        self.mean.as_ref().map(Vec::len)
    }

    fn params(&self) -> Result<(&[f64], &[f64])> {
        match (&self.mean, &self.std) {
            (Some(mean), Some(std)) => Ok((mean, std)),
            _ => Err(VaxError::unfitted("StandardScaler")),
        }
    }

    /// Fits, naming offending columns with `name_of` in degenerate errors.
    pub(crate) fn fit_named<F>(&mut self, x: &Matrix<f64>, name_of: F) -> Result<()>
    where
        F: Fn(usize) -> String,
    {
        let (n_samples, n_features) = x.shape();

        if n_samples == 0 {
            return Err(VaxError::InsufficientData {
                context: "StandardScaler fit".to_string(),
                required: 1,
                actual: 0,
            });
        }

        let mut mean = vec![0.0; n_features];
        for (j, mean_j) in mean.iter_mut().enumerate() {
            let mut sum = 0.0;
            for i in 0..n_samples {
                sum += x.get(i, j);
            }
            *mean_j = sum / n_samples as f64;
        }

        let mut std = vec![0.0; n_features];
        for (j, std_j) in std.iter_mut().enumerate() {
            let mut sum_sq = 0.0;
            for i in 0..n_samples {
                let diff = x.get(i, j) - mean[j];
                sum_sq += diff * diff;
            }
            // Population std (divide by n, not n-1)
            *std_j = (sum_sq / n_samples as f64).sqrt();
            if !(*std_j > DEGENERATE_STD) {
                return Err(VaxError::DegenerateFeature {
                    feature: name_of(j),
                });
            }
        }

        self.mean = Some(mean);
        self.std = Some(std);
        Ok(())
    }

    /// Transforms data back to original scale.
    ///
    /// # Errors
    ///
    /// Returns an error if the scaler is not fitted or dimensions mismatch.
    pub fn inverse_transform(&self, x: &Matrix<f64>) -> Result<Matrix<f64>> {
        let (mean, std) = self.params()?;
        self.map_columns(x, mean, |val, j| val * std[j] + mean[j])
    }

    fn map_columns<F>(&self, x: &Matrix<f64>, mean: &[f64], f: F) -> Result<Matrix<f64>>
    where
        F: Fn(f64, usize) -> f64,
    {
        let (n_samples, n_features) = x.shape();
        if n_features != mean.len() {
            return Err(VaxError::dimension_mismatch(
                "scaler input",
                mean.len(),
                n_features,
            ));
        }

        let mut result = vec![0.0; n_samples * n_features];
        for i in 0..n_samples {
            for j in 0..n_features {
                result[i * n_features + j] = f(x.get(i, j), j);
            }
        }

        Ok(Matrix::from_vec(n_samples, n_features, result)
            .expect("result buffer sized to n_samples * n_features"))
    }
}

impl Transformer for StandardScaler {
    /// Computes the mean and standard deviation of each feature.
    fn fit(&mut self, x: &Matrix<f64>) -> Result<()> {
        self.fit_named(x, |j| format!("column {j}"))
    }

    /// Standardizes the data using fitted mean and std.
    fn transform(&self, x: &Matrix<f64>) -> Result<Matrix<f64>> {
        let (mean, std) = self.params()?;
        self.map_columns(x, mean, |val, j| (val - mean[j]) / std[j])
    }
}
