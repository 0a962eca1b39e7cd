//! Error types for vaxflow operations.
//!
//! Every core failure is a precondition violation detected before a model is
//! invoked. Nothing here is transient, so nothing is retried.

use thiserror::Error;

/// Main error type for vaxflow operations.
///
/// # Examples
///
/// ```
/// use vaxflow::error::VaxError;
///
/// let err = VaxError::missing_feature("Awareness");
/// assert!(err.to_string().contains("Awareness"));
/// ```
#[derive(Debug, Error)]
pub enum VaxError {
    /// A declared feature or column is absent or not numeric.
    #[error("Schema error: field '{field}' {reason}")]
    Schema {
        /// Offending field or column name
        field: String,
        /// What is wrong with it
        reason: String,
    },

    /// Transform or inference attempted before fit/training.
    #[error("Unfitted state: {component} must be fitted before use")]
    UnfittedState {
        /// Component that was used unfitted
        component: String,
    },

    /// A feature column has zero variance, so it cannot be standardized.
    #[error("Degenerate feature: '{feature}' has zero variance")]
    DegenerateFeature {
        /// Feature name (or column index when unnamed)
        feature: String,
    },

    /// Dataset too small for the requested operation.
    #[error("Insufficient data for {context}: need at least {required} rows, got {actual}")]
    InsufficientData {
        /// Operation that needed more data
        context: String,
        /// Minimum rows required
        required: usize,
        /// Rows actually available
        actual: usize,
    },

    /// A model pair was used with a processor it was not trained against.
    #[error("Processor mismatch: models were trained with processor {expected:016x}, got {actual:016x}")]
    ProcessorMismatch {
        /// Fingerprint recorded at training time
        expected: u64,
        /// Fingerprint of the processor supplied
        actual: u64,
    },

    /// Invalid hyperparameter or configuration value.
    #[error("Invalid hyperparameter: {param} = {value}, expected {constraint}")]
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// I/O error (export files, config files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding/decoding error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding/decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VaxError {
    /// Create a schema error for a feature that is absent.
    #[must_use]
    pub fn missing_feature(field: &str) -> Self {
        Self::Schema {
            field: field.to_string(),
            reason: "is missing".to_string(),
        }
    }

    /// Create a schema error for a feature whose value is not a finite number.
    #[must_use]
    pub fn non_numeric(field: &str, value: f64) -> Self {
        Self::Schema {
            field: field.to_string(),
            reason: format!("is not a finite number (got {value})"),
        }
    }

    /// Create an unfitted-state error for the named component.
    #[must_use]
    pub fn unfitted(component: &str) -> Self {
        Self::UnfittedState {
            component: component.to_string(),
        }
    }

    /// Create a dimension mismatch error with descriptive context.
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::Schema {
            field: context.to_string(),
            reason: format!("has {actual} columns, expected {expected}"),
        }
    }

    /// Returns true for errors caused by the caller's input record or table.
    #[must_use]
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, VaxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_display() {
        let err = VaxError::missing_feature("Population");
        let msg = err.to_string();
        assert!(msg.contains("Schema error"));
        assert!(msg.contains("Population"));
        assert!(msg.contains("missing"));
        assert!(err.is_schema());
    }

    #[test]
    fn test_non_numeric_display() {
        let err = VaxError::non_numeric("Awareness", f64::NAN);
        assert!(err.to_string().contains("NaN"));
    }

    #[test]
    fn test_unfitted_display() {
        let err = VaxError::unfitted("StandardScaler");
        assert!(err.to_string().contains("StandardScaler"));
        assert!(!err.is_schema());
    }

    #[test]
    fn test_degenerate_display() {
        let err = VaxError::DegenerateFeature {
            feature: "Age_Dist".to_string(),
        };
        assert!(err.to_string().contains("zero variance"));
    }

    #[test]
    fn test_insufficient_data_display() {
        let err = VaxError::InsufficientData {
            context: "train/test split".to_string(),
            required: 2,
            actual: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("train/test split"));
        assert!(msg.contains("2"));
        assert!(msg.contains("1"));
    }

    #[test]
    fn test_processor_mismatch_display() {
        let err = VaxError::ProcessorMismatch {
            expected: 0xABCD,
            actual: 0x1234,
        };
        let msg = err.to_string();
        assert!(msg.contains("000000000000abcd"));
        assert!(msg.contains("0000000000001234"));
    }

    #[test]
    fn test_dimension_mismatch_helper() {
        let err = VaxError::dimension_mismatch("features", 7, 5);
        let msg = err.to_string();
        assert!(msg.contains("features"));
        assert!(msg.contains("expected 7"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csv");
        let err: VaxError = io_err.into();
        assert!(matches!(err, VaxError::Io(_)));
    }

    #[test]
    fn test_error_source_io() {
        use std::error::Error;
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = VaxError::Io(io_err);
        assert!(err.source().is_some());
        assert!(VaxError::unfitted("x").source().is_none());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<VaxError>();
    }
}
