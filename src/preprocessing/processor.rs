//! Feature Processor: the fitted scaler bound to the canonical feature order.

use super::StandardScaler;
use crate::data::{AreaRecord, DataFrame, Feature};
use crate::error::{Result, VaxError};
use crate::primitives::Matrix;
use crate::traits::Transformer;
use serde::{Deserialize, Serialize};

/// Standardizes the seven declared features in canonical order.
///
/// Fitted once on training data and read-only afterwards. The fitted state
/// carries a fingerprint of its parameters so models trained on its output
/// can refuse a different processor.
///
/// # Examples
///
/// ```
/// use vaxflow::preprocessing::FeatureProcessor;
/// use vaxflow::synthetic::generate;
///
/// let df = generate(50, 42).unwrap();
/// let mut processor = FeatureProcessor::new();
/// processor.fit(&df).unwrap();
///
/// let x = processor.transform_table(&df).unwrap();
/// assert_eq!(x.shape(), (50, 7));
/// assert!(processor.fingerprint().is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureProcessor {
    scaler: StandardScaler,
    feature_names: Vec<String>,
}

impl FeatureProcessor {
    /// Creates an unfitted processor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once [`fit`](Self::fit) has succeeded.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.scaler.is_fitted()
    }

    /// Feature names in the order the scaler was fitted (empty before fit).
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Underlying scaler.
    #[must_use]
    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Fits the scaler on the declared feature columns of `df`.
    ///
    /// Extra columns (targets, identifiers) are ignored.
    ///
    /// # Errors
    ///
    /// Returns a schema error if a declared feature column is absent,
    /// `DegenerateFeature` if one has zero variance, and `InsufficientData`
    /// for an empty table.
    pub fn fit(&mut self, df: &DataFrame) -> Result<()> {
        let x = Self::feature_matrix(df)?;
        let mut scaler = StandardScaler::new();
        scaler.fit_named(&x, |j| Feature::ALL[j].name().to_string())?;

        self.scaler = scaler;
        self.feature_names = Feature::names().iter().map(|s| (*s).to_string()).collect();
        Ok(())
    }

    /// Fits on `df` and returns its standardized feature matrix.
    ///
    /// # Errors
    ///
    /// Same as [`fit`](Self::fit).
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<Matrix<f64>> {
        self.fit(df)?;
        self.transform_table(df)
    }

    /// Standardizes the declared feature columns of `df`.
    ///
    /// # Errors
    ///
    /// Returns `UnfittedState` before fit and a schema error if a declared
    /// column is absent.
    pub fn transform_table(&self, df: &DataFrame) -> Result<Matrix<f64>> {
        self.ensure_fitted()?;
        self.scaler.transform(&Self::feature_matrix(df)?)
    }

    /// Standardizes one validated record into a `1 x 7` matrix.
    ///
    /// # Errors
    ///
    /// Returns `UnfittedState` before fit and a schema error for a
    /// non-finite feature.
    pub fn transform_record(&self, record: &AreaRecord) -> Result<Matrix<f64>> {
        self.ensure_fitted()?;
        record.validate()?;
        let x = Matrix::from_vec(1, Feature::COUNT, record.to_array().to_vec())
            .expect("a record has exactly one value per feature");
        self.scaler.transform(&x)
    }

    /// Maps standardized rows back to raw feature units.
    ///
    /// # Errors
    ///
    /// Returns `UnfittedState` before fit and a schema error when the column
    /// count is not the feature count.
    pub fn inverse_transform(&self, x: &Matrix<f64>) -> Result<Matrix<f64>> {
        self.ensure_fitted()?;
        self.scaler.inverse_transform(x)
    }

    /// Fingerprint of the fitted parameters, or `None` before fit.
    ///
    /// Two processors fitted on the same data share a fingerprint; any change
    /// in a mean or std changes it.
    #[must_use]
    pub fn fingerprint(&self) -> Option<u64> {
        let (mean, std) = (self.scaler.mean()?, self.scaler.std()?);
        let mut hash = Fnv1a::new();
        for name in &self.feature_names {
            hash.write(name.as_bytes());
        }
        for value in mean.iter().chain(std) {
            hash.write(&value.to_bits().to_le_bytes());
        }
        Some(hash.finish())
    }

    fn ensure_fitted(&self) -> Result<()> {
        if self.is_fitted() {
            Ok(())
        } else {
            Err(VaxError::unfitted("FeatureProcessor"))
        }
    }

    fn feature_matrix(df: &DataFrame) -> Result<Matrix<f64>> {
        let features = df.select(&Feature::names())?;
        for (name, column) in features.iter_columns() {
            if let Some(&bad) = column.as_slice().iter().find(|v| !v.is_finite()) {
                return Err(VaxError::non_numeric(name, bad));
            }
        }
        Ok(features.to_matrix())
    }
}

/// 64-bit FNV-1a; stable across runs and platforms.
struct Fnv1a(u64);

impl Fnv1a {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    fn new() -> Self {
        Self(Self::OFFSET)
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= u64::from(b);
            self.0 = self.0.wrapping_mul(Self::PRIME);
        }
    }

    fn finish(&self) -> u64 {
        self.0
    }
}
