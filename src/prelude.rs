//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use vaxflow::prelude::*;
//! ```

pub use crate::config::{ForestConfig, GeneratorConfig, PipelineConfig, TrainerConfig};
pub use crate::data::{AreaRecord, DataFrame, Feature, FieldMap, RiskLevel};
pub use crate::error::{Result, VaxError};
pub use crate::metrics::{mae, mse, r_squared, rmse};
pub use crate::preprocessing::{FeatureProcessor, StandardScaler};
pub use crate::primitives::{Matrix, Vector};
pub use crate::strategy::batch::{evaluate_batch, evaluate_frame, BatchReport, BatchRow};
pub use crate::strategy::{RecommendationCode, StrategyEngine, StrategyResult};
pub use crate::synthetic::{generate, SyntheticGenerator};
pub use crate::trainer::{DualModelTrainer, ModelPair, TrainedPipeline};
pub use crate::traits::{Estimator, Transformer};
pub use crate::tree::{MaxFeatures, RandomForestClassifier, RandomForestRegressor};
