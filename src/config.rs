//! Pipeline configuration.
//!
//! Defaults reproduce the reference setup: 500 samples at seed 42, an 80/20
//! split at seed 42, a 100-tree depth-15 demand forest and a 100-tree depth-10
//! risk forest drawing `sqrt` features per split. Any subset of fields can be
//! overridden from a JSON file; a partial forest section keeps that forest's
//! own defaults for the fields it leaves out.
//!
//! ```
//! use vaxflow::config::PipelineConfig;
//!
//! let config: PipelineConfig = serde_json::from_str(
//!     r#"{ "demand_threshold": 400.0, "trainer": { "risk_forest": { "n_estimators": 10 } } }"#,
//! )
//! .unwrap();
//! assert_eq!(config.demand_threshold, 400.0);
//! assert_eq!(config.trainer.demand_forest.n_estimators, 100);
//! assert_eq!(config.trainer.risk_forest.n_estimators, 10);
//! assert_eq!(config.trainer.risk_forest.max_depth, Some(10));
//! config.validate().unwrap();
//! ```

use crate::error::{Result, VaxError};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

pub use crate::synthetic::{FeatureRange, GeneratorConfig};
pub use crate::tree::MaxFeatures;

/// Demand above which shipments should be scheduled more often.
pub const DEFAULT_DEMAND_THRESHOLD: f64 = 1000.0;

fn invalid(param: &str, value: impl ToString, constraint: &str) -> VaxError {
    VaxError::InvalidHyperparameter {
        param: param.to_string(),
        value: value.to_string(),
        constraint: constraint.to_string(),
    }
}

/// Hyperparameters of one random forest.
///
/// Fields absent from a standalone JSON object take the values of
/// [`ForestConfig::default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth of each tree; `null` grows until leaves are pure
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Features considered per split
    pub max_features: MaxFeatures,
    /// Base seed; tree `i` uses `random_state + i`
    pub random_state: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self::new(100)
    }
}

impl ForestConfig {
    /// Creates a forest configuration with `n_estimators` trees, unlimited
    /// depth, min split 2, every feature per split and seed 42.
    #[must_use]
    pub fn new(n_estimators: usize) -> Self {
        Self {
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            max_features: MaxFeatures::All,
            random_state: 42,
        }
    }

    /// 100 trees, depth 15, min split 5, every feature per split.
    #[must_use]
    pub fn demand_default() -> Self {
        Self::new(100).with_max_depth(15).with_min_samples_split(5)
    }

    /// 100 trees, depth 10, min split 5, `sqrt` features per split.
    #[must_use]
    pub fn risk_default() -> Self {
        Self::new(100)
            .with_max_depth(10)
            .with_min_samples_split(5)
            .with_max_features(MaxFeatures::Sqrt)
    }

    /// Sets the per-split feature budget.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Sets the maximum depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Sets the minimum split size.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Sets the base seed.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    /// Sets the number of trees.
    #[must_use]
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(invalid(&format!("{name}.n_estimators"), 0, ">= 1"));
        }
        if self.min_samples_split < 2 {
            return Err(invalid(
                &format!("{name}.min_samples_split"),
                self.min_samples_split,
                ">= 2",
            ));
        }
        Ok(())
    }
}

/// Overlays the keys of a JSON object onto `base`.
fn overlay_forest<'de, D>(
    base: ForestConfig,
    deserializer: D,
) -> std::result::Result<ForestConfig, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
    let mut merged = serde_json::to_value(base).map_err(D::Error::custom)?;
    if let Some(fields) = merged.as_object_mut() {
        fields.extend(overrides);
    }
    serde_json::from_value(merged).map_err(D::Error::custom)
}

fn demand_forest<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<ForestConfig, D::Error> {
    overlay_forest(ForestConfig::demand_default(), d)
}

fn risk_forest<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<ForestConfig, D::Error> {
    overlay_forest(ForestConfig::risk_default(), d)
}

/// Settings of the dual model trainer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Held-out fraction, in (0, 1)
    pub test_size: f64,
    /// Seed of the train/test shuffle
    pub split_seed: u64,
    /// Demand regressor hyperparameters
    #[serde(deserialize_with = "demand_forest")]
    pub demand_forest: ForestConfig,
    /// Waste-risk classifier hyperparameters
    #[serde(deserialize_with = "risk_forest")]
    pub risk_forest: ForestConfig,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            split_seed: 42,
            demand_forest: ForestConfig::demand_default(),
            risk_forest: ForestConfig::risk_default(),
        }
    }
}

impl TrainerConfig {
    /// Sets the held-out fraction.
    #[must_use]
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    /// Sets the split seed.
    #[must_use]
    pub fn with_split_seed(mut self, split_seed: u64) -> Self {
        self.split_seed = split_seed;
        self
    }

    /// Replaces the demand forest settings.
    #[must_use]
    pub fn with_demand_forest(mut self, forest: ForestConfig) -> Self {
        self.demand_forest = forest;
        self
    }

    /// Replaces the risk forest settings.
    #[must_use]
    pub fn with_risk_forest(mut self, forest: ForestConfig) -> Self {
        self.risk_forest = forest;
        self
    }

    /// Sets the tree count of both forests.
    #[must_use]
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.demand_forest.n_estimators = n_estimators;
        self.risk_forest.n_estimators = n_estimators;
        self
    }

    /// Checks split fraction and forest hyperparameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` naming the offending setting.
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(invalid("test_size", self.test_size, "0 < test_size < 1"));
        }
        self.demand_forest.validate("demand_forest")?;
        self.risk_forest.validate("risk_forest")
    }
}

/// Full configuration of a generate / train / evaluate run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Synthetic data settings
    pub generator: GeneratorConfig,
    /// Trainer settings
    pub trainer: TrainerConfig,
    /// Demand above which `IncreaseShipmentFrequency` is recommended
    pub demand_threshold: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            trainer: TrainerConfig::default(),
            demand_threshold: DEFAULT_DEMAND_THRESHOLD,
        }
    }
}

impl PipelineConfig {
    /// Replaces the generator settings.
    #[must_use]
    pub fn with_generator(mut self, generator: GeneratorConfig) -> Self {
        self.generator = generator;
        self
    }

    /// Replaces the trainer settings.
    #[must_use]
    pub fn with_trainer(mut self, trainer: TrainerConfig) -> Self {
        self.trainer = trainer;
        self
    }

    /// Sets the demand threshold.
    #[must_use]
    pub fn with_demand_threshold(mut self, threshold: f64) -> Self {
        self.demand_threshold = threshold;
        self
    }

    /// Loads a configuration from JSON; absent fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an I/O or JSON error if the file cannot be read or parsed, and
    /// `InvalidHyperparameter` if the result fails [`validate`](Self::validate).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` naming the offending setting.
    pub fn validate(&self) -> Result<()> {
        self.generator.validate()?;
        self.trainer.validate()?;
        if !self.demand_threshold.is_finite() {
            return Err(invalid(
                "demand_threshold",
                self.demand_threshold,
                "a finite number",
            ));
        }
        Ok(())
    }
}
