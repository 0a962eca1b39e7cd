//! vaxflow: vaccine demand forecasting and wastage-risk strategy in pure Rust.
//!
//! vaxflow trains a random forest regressor (daily dose demand) and a random
//! forest classifier (Low/Medium/High waste risk) on standardized area
//! features, then turns their predictions into actionable recommendations.
//!
//! # Quick Start
//!
//! ```
//! use vaxflow::prelude::*;
//!
//! // Synthetic training table, fixed seed
//! let df = generate(300, 42).unwrap();
//!
//! // Train both models on the same split
//! let pipeline = DualModelTrainer::new(TrainerConfig::default().with_n_estimators(10))
//!     .train(&df)
//!     .unwrap();
//!
//! // Evaluate one area
//! let area = AreaRecord::from_array([150_000.0, 0.35, 2500.0, 3.5, 75.0, 0.85, 45.0]);
//! let result = StrategyEngine::new()
//!     .evaluate(&area, pipeline.processor(), pipeline.models())
//!     .unwrap();
//! assert!(!result.recommendations.is_empty());
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: Core Vector and Matrix types
//! - [`data`]: DataFrame for named columns and the Area Record schema
//! - [`synthetic`]: Seeded synthetic area data with ground-truth targets
//! - [`preprocessing`]: Standard scaler and the feature processor
//! - [`tree`]: CART trees and random forests
//! - [`metrics`]: Regression and classification metrics
//! - [`model_selection`]: Seeded train/test splitting
//! - [`trainer`]: Dual model trainer and trained pipeline
//! - [`strategy`]: Strategy engine and batch runner
//! - [`config`]: Pipeline configuration
//! - [`export`]: CSV import and export

pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod metrics;
pub mod model_selection;
pub mod prelude;
pub mod preprocessing;
pub mod primitives;
pub mod strategy;
pub mod synthetic;
pub mod trainer;
pub mod traits;
pub mod tree;

pub use error::{Result, VaxError};
pub use primitives::{Matrix, Vector};
pub use traits::{Estimator, Transformer};
