//! Core traits for estimators and transformers.
//!
//! These traits define the fit/predict/transform contracts shared by the
//! scaler and the regression forest.

use crate::error::Result;
use crate::primitives::{Matrix, Vector};

/// Supervised estimator over a continuous target.
///
/// # Examples
///
/// ```
/// use vaxflow::prelude::*;
/// use vaxflow::tree::RandomForestRegressor;
///
/// let x = Matrix::from_vec(6, 1, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
/// let y = Vector::from_slice(&[2.0, 4.0, 6.0, 8.0, 10.0, 12.0]);
///
/// let mut model = RandomForestRegressor::new(5).with_random_state(7);
/// Estimator::fit(&mut model, &x, &y).unwrap();
/// assert_eq!(Estimator::predict(&model, &x).len(), 6);
/// ```
pub trait Estimator {
    /// Fits the model to training data.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails (dimension mismatch, empty data, etc.).
    fn fit(&mut self, x: &Matrix<f64>, y: &Vector<f64>) -> Result<()>;

    /// Predicts target values for input data.
    fn predict(&self, x: &Matrix<f64>) -> Vector<f64>;

    /// Computes the R² score on `x`, `y`.
    fn score(&self, x: &Matrix<f64>, y: &Vector<f64>) -> f64 {
        crate::metrics::r_squared(&self.predict(x), y)
    }
}

/// Trait for data transformers (scalers).
///
/// ```text
/// let mut scaler = StandardScaler::new();
/// let x_scaled = scaler.fit_transform(&x)?;
/// let x_test_scaled = scaler.transform(&x_test)?;
/// ```
pub trait Transformer {
    /// Fits the transformer to data.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails.
    fn fit(&mut self, x: &Matrix<f64>) -> Result<()>;

    /// Transforms data using fitted parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if transformer is not fitted.
    fn transform(&self, x: &Matrix<f64>) -> Result<Matrix<f64>>;

    /// Fits and transforms in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails.
    fn fit_transform(&mut self, x: &Matrix<f64>) -> Result<Matrix<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VaxError;

    // Mock transformer to test trait default methods
    struct OffsetTransformer {
        offset: Option<f64>,
    }

    impl Transformer for OffsetTransformer {
        fn fit(&mut self, x: &Matrix<f64>) -> Result<()> {
            if x.n_rows() == 0 {
                return Err(VaxError::InsufficientData {
                    context: "mock fit".to_string(),
                    required: 1,
                    actual: 0,
                });
            }
            self.offset = Some(x.get(0, 0));
            Ok(())
        }

        fn transform(&self, x: &Matrix<f64>) -> Result<Matrix<f64>> {
            let offset = self.offset.ok_or_else(|| VaxError::unfitted("mock"))?;
            let data = x.as_slice().iter().map(|v| v - offset).collect();
            Matrix::from_vec(x.n_rows(), x.n_cols(), data).map_err(|e| VaxError::Schema {
                field: "mock".to_string(),
                reason: e.to_string(),
            })
        }
    }

    #[test]
    fn test_fit_transform_default_fits_first() {
        let mut t = OffsetTransformer { offset: None };
        let x = Matrix::from_vec(2, 1, vec![3.0, 5.0]).expect("valid");
        let out = t.fit_transform(&x).expect("fit_transform");
        assert_eq!(out.as_slice(), &[0.0, 2.0]);
    }

    #[test]
    fn test_fit_transform_propagates_fit_error() {
        let mut t = OffsetTransformer { offset: None };
        let x = Matrix::zeros(0, 1);
        assert!(t.fit_transform(&x).is_err());
        assert!(t.transform(&Matrix::zeros(1, 1)).is_err());
    }
}
