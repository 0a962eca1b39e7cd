//! Dual Model Trainer.
//!
//! Fits the feature processor, splits once, and trains the demand regressor
//! and the waste-risk classifier on the same partition. The result is an
//! immutable [`TrainedPipeline`].
//!
//! # Example
//!
//! ```
//! use vaxflow::config::TrainerConfig;
//! use vaxflow::synthetic::generate;
//! use vaxflow::trainer::DualModelTrainer;
//!
//! let df = generate(200, 42).unwrap();
//! let pipeline = DualModelTrainer::new(TrainerConfig::default().with_n_estimators(10))
//!     .train(&df)
//!     .unwrap();
//!
//! let importance = pipeline.feature_importance();
//! assert_eq!(importance.len(), 7);
//! assert!(pipeline.metrics().demand_r2 <= 1.0);
//! ```

use crate::config::{ForestConfig, TrainerConfig};
use crate::data::{DataFrame, Feature, RiskLevel, DEMAND_COLUMN, WASTE_RISK_COLUMN};
use crate::error::{Result, VaxError};
use crate::metrics::classification::{confusion_matrix, ClassificationReport};
use crate::metrics::{mae, r_squared, rmse};
use crate::model_selection::split_indices;
use crate::preprocessing::FeatureProcessor;
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;
use crate::tree::{RandomForestClassifier, RandomForestRegressor};
use serde::Serialize;
use tracing::info;

/// The fitted regressor and classifier, bound to the processor they were
/// trained against.
#[derive(Debug, Clone)]
pub struct ModelPair {
    demand: RandomForestRegressor,
    risk: RandomForestClassifier,
    processor_fingerprint: u64,
}

impl ModelPair {
    /// Demand regressor.
    #[must_use]
    pub fn demand_model(&self) -> &RandomForestRegressor {
        &self.demand
    }

    /// Waste-risk classifier.
    #[must_use]
    pub fn risk_model(&self) -> &RandomForestClassifier {
        &self.risk
    }

    /// Fingerprint of the processor whose output the models were fitted on.
    #[must_use]
    pub fn processor_fingerprint(&self) -> u64 {
        self.processor_fingerprint
    }

    /// Fails unless `processor` is the one these models were trained against.
    ///
    /// # Errors
    ///
    /// Returns `UnfittedState` for an unfitted processor and
    /// `ProcessorMismatch` for a foreign one.
    pub fn check_processor(&self, processor: &FeatureProcessor) -> Result<()> {
        let actual = processor
            .fingerprint()
            .ok_or_else(|| VaxError::unfitted("FeatureProcessor"))?;
        if actual != self.processor_fingerprint {
            return Err(VaxError::ProcessorMismatch {
                expected: self.processor_fingerprint,
                actual,
            });
        }
        Ok(())
    }

    /// Demand and class probabilities for one standardized row.
    pub(crate) fn predict_row(&self, row: &[f64]) -> (f64, Vec<f64>) {
        (
            self.demand.predict_row(row),
            self.risk.predict_proba_row(row),
        )
    }
}

/// Held-out evaluation of both models.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingMetrics {
    /// Rows used for fitting
    pub n_train: usize,
    /// Rows held out
    pub n_test: usize,
    /// Root mean squared error of demand, in doses
    pub demand_rmse: f64,
    /// Mean absolute error of demand, in doses
    pub demand_mae: f64,
    /// Coefficient of determination of demand
    pub demand_r2: f64,
    /// Fraction of correctly classified risk levels
    pub risk_accuracy: f64,
    /// Per-class precision, recall, F1 and support plus averages
    pub risk_report: ClassificationReport,
    /// Rows are true Low/Medium/High, columns predicted
    pub confusion_matrix: Matrix<usize>,
}

/// Importance of one feature to each model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    /// Feature the scores refer to
    #[serde(rename = "Feature")]
    pub feature: Feature,
    /// Share of the demand regressor's impurity decrease
    #[serde(rename = "Demand_Importance")]
    pub demand_importance: f64,
    /// Share of the risk classifier's impurity decrease
    #[serde(rename = "Waste_Importance")]
    pub waste_importance: f64,
}

/// Everything a training run produces. Immutable; accessors only.
#[derive(Debug, Clone)]
pub struct TrainedPipeline {
    processor: FeatureProcessor,
    models: ModelPair,
    metrics: TrainingMetrics,
}

impl TrainedPipeline {
    /// Processor fitted on the training table.
    #[must_use]
    pub fn processor(&self) -> &FeatureProcessor {
        &self.processor
    }

    /// The trained model pair.
    #[must_use]
    pub fn models(&self) -> &ModelPair {
        &self.models
    }

    /// Held-out metrics.
    #[must_use]
    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// One entry per declared feature, by descending demand importance.
    ///
    /// Each model's importances lie in [0, 1] and sum to 1.
    #[must_use]
    pub fn feature_importance(&self) -> Vec<FeatureImportance> {
        let demand = self
            .models
            .demand
            .feature_importances()
            .unwrap_or_else(|| vec![0.0; Feature::COUNT]);
        let waste = self
            .models
            .risk
            .feature_importances()
            .unwrap_or_else(|| vec![0.0; Feature::COUNT]);

        let mut table: Vec<FeatureImportance> = Feature::ALL
            .iter()
            .map(|&feature| FeatureImportance {
                feature,
                demand_importance: demand[feature.index()],
                waste_importance: waste[feature.index()],
            })
            .collect();
        table.sort_by(|a, b| b.demand_importance.total_cmp(&a.demand_importance));
        table
    }

    /// Splits the pipeline into its processor and model pair.
    #[must_use]
    pub fn into_parts(self) -> (FeatureProcessor, ModelPair, TrainingMetrics) {
        (self.processor, self.models, self.metrics)
    }
}

/// Builder that trains a [`TrainedPipeline`] from a labeled table.
#[derive(Debug, Clone, Default)]
pub struct DualModelTrainer {
    config: TrainerConfig,
}

impl DualModelTrainer {
    /// Creates a trainer.
    #[must_use]
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    /// Trainer settings.
    #[must_use]
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Trains both models on `df`.
    ///
    /// `df` needs the seven feature columns plus `Demand` and `Waste_Risk`
    /// (values 0, 1, 2). Extra columns are ignored.
    ///
    /// # Errors
    ///
    /// - `InvalidHyperparameter` for an invalid configuration
    /// - a schema error for missing columns, non-finite cells, or a risk
    ///   label outside {0, 1, 2}
    /// - `InsufficientData` if the split would leave a side empty, checked
    ///   before the processor is fitted
    /// - `DegenerateFeature` for a constant feature column
    pub fn train(&self, df: &DataFrame) -> Result<TrainedPipeline> {
        self.config.validate()?;
        let demand = df.column(DEMAND_COLUMN)?;
        let risk = risk_labels(df.column(WASTE_RISK_COLUMN)?)?;
        if let Some(&bad) = demand.as_slice().iter().find(|d| !d.is_finite()) {
            return Err(VaxError::non_numeric(DEMAND_COLUMN, bad));
        }

        info!(
            n_samples = df.n_rows(),
            test_size = self.config.test_size,
            split_seed = self.config.split_seed,
            "training demand and waste-risk models"
        );

        // A table too small to split is rejected before any column statistics.
        let split = split_indices(df.n_rows(), self.config.test_size, self.config.split_seed)?;

        let mut processor = FeatureProcessor::new();
        let x = processor.fit_transform(df)?;
        let fingerprint = processor
            .fingerprint()
            .ok_or_else(|| VaxError::unfitted("FeatureProcessor"))?;

        let x_train = x.select_rows(&split.train);
        let x_test = x.select_rows(&split.test);
        let demand_train = demand.select(&split.train);
        let demand_test = demand.select(&split.test);
        let risk_train: Vec<usize> = split.train.iter().map(|&i| risk[i]).collect();
        let risk_test: Vec<usize> = split.test.iter().map(|&i| risk[i]).collect();

        let mut demand_model = regressor(&self.config.demand_forest);
        demand_model.fit(&x_train, &demand_train)?;
        let demand_pred = demand_model.predict(&x_test);

        let mut risk_model = classifier(&self.config.risk_forest);
        risk_model.fit(&x_train, &risk_train)?;
        let risk_pred = risk_model.predict(&x_test);

        let metrics = evaluate_holdout(&demand_pred, &demand_test, &risk_pred, &risk_test, &split);

        info!(
            rmse = metrics.demand_rmse,
            r2 = metrics.demand_r2,
            accuracy = metrics.risk_accuracy,
            n_test = metrics.n_test,
            "training complete"
        );

        Ok(TrainedPipeline {
            processor,
            models: ModelPair {
                demand: demand_model,
                risk: risk_model,
                processor_fingerprint: fingerprint,
            },
            metrics,
        })
    }
}

fn regressor(config: &ForestConfig) -> RandomForestRegressor {
    let rf = RandomForestRegressor::new(config.n_estimators)
        .with_min_samples_split(config.min_samples_split)
        .with_max_features(config.max_features)
        .with_random_state(config.random_state);
    match config.max_depth {
        Some(depth) => rf.with_max_depth(depth),
        None => rf,
    }
}

fn classifier(config: &ForestConfig) -> RandomForestClassifier {
    let rf = RandomForestClassifier::new(config.n_estimators)
        .with_min_samples_split(config.min_samples_split)
        .with_max_features(config.max_features)
        .with_random_state(config.random_state)
        .with_n_classes(RiskLevel::N_CLASSES);
    match config.max_depth {
        Some(depth) => rf.with_max_depth(depth),
        None => rf,
    }
}

/// Converts the `Waste_Risk` column to class indices.
fn risk_labels(column: &Vector<f64>) -> Result<Vec<usize>> {
    column
        .as_slice()
        .iter()
        .map(|&v| {
            if v.fract() == 0.0 && (0.0..RiskLevel::N_CLASSES as f64).contains(&v) {
                Ok(v as usize)
            } else {
                Err(VaxError::Schema {
                    field: WASTE_RISK_COLUMN.to_string(),
                    reason: format!("contains {v}, expected 0, 1 or 2"),
                })
            }
        })
        .collect()
}

fn evaluate_holdout(
    demand_pred: &Vector<f64>,
    demand_test: &Vector<f64>,
    risk_pred: &[usize],
    risk_test: &[usize],
    split: &crate::model_selection::SplitIndices,
) -> TrainingMetrics {
    let labels = RiskLevel::ALL.map(RiskLevel::label);
    let risk_report = ClassificationReport::new(risk_pred, risk_test, &labels);
    TrainingMetrics {
        n_train: split.n_train(),
        n_test: split.n_test(),
        demand_rmse: rmse(demand_pred, demand_test),
        demand_mae: mae(demand_pred, demand_test),
        demand_r2: r_squared(demand_pred, demand_test),
        risk_accuracy: risk_report.accuracy,
        confusion_matrix: confusion_matrix(risk_pred, risk_test, RiskLevel::N_CLASSES),
        risk_report,
    }
}

#[cfg(test)]
#[path = "trainer_tests.rs"]
mod tests;
