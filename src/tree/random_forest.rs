//! Random forest ensembles over bootstrap samples.
//!
//! Tree `i` owns an RNG seeded with `random_state + i`. It draws the
//! bootstrap sample first and then the per-split feature orders, so a forest
//! is reproducible regardless of how rayon schedules the trees.

use super::helpers::{bootstrap_sample, normalize};
use super::{DecisionTreeClassifier, DecisionTreeRegressor, MaxFeatures};
use crate::error::{Result, VaxError};
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

fn validate_n_estimators(n_estimators: usize) -> Result<()> {
    if n_estimators == 0 {
        return Err(VaxError::InvalidHyperparameter {
            param: "n_estimators".to_string(),
            value: "0".to_string(),
            constraint: ">= 1".to_string(),
        });
    }
    Ok(())
}

/// Mean of per-tree importances, each normalized to sum to 1 first.
fn forest_importances<I>(per_tree: I, n_features: usize) -> Vec<f64>
where
    I: Iterator<Item = Vec<f64>>,
{
    let mut total = vec![0.0; n_features];
    for mut importances in per_tree {
        normalize(&mut importances);
        for (t, v) in total.iter_mut().zip(importances) {
            *t += v;
        }
    }
    normalize(&mut total);
    total
}

/// Random Forest regressor - averages an ensemble of regression trees.
///
/// # Example
///
/// ```
/// use vaxflow::prelude::*;
/// use vaxflow::tree::RandomForestRegressor;
///
/// let x = Matrix::from_vec(8, 1, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0])
///     .expect("valid matrix");
/// let y = Vector::from_slice(&[1.0, 1.0, 1.0, 1.0, 9.0, 9.0, 9.0, 9.0]);
///
/// let mut rf = RandomForestRegressor::new(20).with_max_depth(3).with_random_state(42);
/// rf.fit(&x, &y).expect("fit should succeed");
/// let pred = rf.predict(&x);
/// assert!(pred[0] < pred[7]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    trees: Vec<DecisionTreeRegressor>,
    n_estimators: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    max_features: MaxFeatures,
    random_state: u64,
    n_features: usize,
}

impl RandomForestRegressor {
    /// Creates a new Random Forest regressor with `n_estimators` trees.
    #[must_use]
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            max_features: MaxFeatures::All,
            random_state: 0,
            n_features: 0,
        }
    }

    /// Sets the maximum depth for each tree.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Sets the minimum number of samples required to split a node.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Sets how many features each split considers.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Sets the base seed; tree `i` uses `random_state + i`.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    /// Number of trees requested.
    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    /// Returns true once the forest has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Fitted trees.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTreeRegressor] {
        &self.trees
    }

    fn make_tree(&self) -> DecisionTreeRegressor {
        let tree = DecisionTreeRegressor::new()
            .with_min_samples_split(self.min_samples_split)
            .with_max_features(self.max_features);
        match self.max_depth {
            Some(depth) => tree.with_max_depth(depth),
            None => tree,
        }
    }

    /// Predicts one standardized row: the mean of the tree predictions.
    ///
    /// # Panics
    ///
    /// Panics if the model hasn't been fitted yet.
    #[must_use]
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        assert!(
            self.is_fitted(),
            "Cannot predict with an unfitted Random Forest. Call fit() first."
        );
        self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / self.trees.len() as f64
    }

    /// Returns mean-decrease-in-impurity importances summing to 1.0.
    ///
    /// Returns `None` before fit.
    #[must_use]
    pub fn feature_importances(&self) -> Option<Vec<f64>> {
        if !self.is_fitted() {
            return None;
        }
        Some(forest_importances(
            self.trees.iter().map(DecisionTreeRegressor::raw_importances),
            self.n_features,
        ))
    }
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Estimator for RandomForestRegressor {
    fn fit(&mut self, x: &Matrix<f64>, y: &Vector<f64>) -> Result<()> {
        validate_n_estimators(self.n_estimators)?;
        super::validate_fit_inputs(x, y.len())?;

        let n_samples = x.n_rows();
        let base_seed = self.random_state;
        let template = self.make_tree();
        let trees: Vec<DecisionTreeRegressor> = (0..self.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(i as u64));
                let indices = bootstrap_sample(n_samples, &mut rng);
                let mut tree = template.clone();
                tree.fit_indices(x, y.as_slice(), &indices, &mut rng);
                tree
            })
            .collect();

        debug!(
            n_trees = trees.len(),
            n_samples,
            max_depth = ?self.max_depth,
            "fitted random forest regressor"
        );

        self.n_features = x.n_cols();
        self.trees = trees;
        Ok(())
    }

    /// Makes predictions for input data by averaging predictions from all trees.
    ///
    /// # Panics
    ///
    /// Panics if the model hasn't been fitted yet.
    fn predict(&self, x: &Matrix<f64>) -> Vector<f64> {
        Vector::from_vec((0..x.n_rows()).map(|i| self.predict_row(x.row_slice(i))).collect())
    }
}

/// Random Forest classifier over classification trees.
///
/// Class probabilities are the mean of the trees' leaf class fractions, and
/// the predicted class is their argmax.
///
/// # Example
///
/// ```
/// use vaxflow::prelude::*;
/// use vaxflow::tree::RandomForestClassifier;
///
/// let x = Matrix::from_vec(6, 1, vec![0.0, 0.1, 0.2, 0.8, 0.9, 1.0]).expect("valid matrix");
/// let y = vec![0, 0, 0, 1, 1, 1];
///
/// let mut rf = RandomForestClassifier::new(15).with_n_classes(3).with_random_state(42);
/// rf.fit(&x, &y).expect("fit should succeed");
/// let proba = rf.predict_proba(&x);
/// assert_eq!(proba.shape(), (6, 3));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    trees: Vec<DecisionTreeClassifier>,
    n_estimators: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    max_features: MaxFeatures,
    random_state: u64,
    n_classes: usize,
    n_features: usize,
}

impl RandomForestClassifier {
    /// Creates a new Random Forest classifier with `n_estimators` trees.
    #[must_use]
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            max_features: MaxFeatures::All,
            random_state: 0,
            n_classes: 0,
            n_features: 0,
        }
    }

    /// Sets the maximum depth for each tree.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Sets the minimum number of samples required to split a node.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Sets how many features each split considers.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Sets the base seed; tree `i` uses `random_state + i`.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    /// Fixes the number of classes, so probability rows keep a column for
    /// classes absent from the training labels.
    #[must_use]
    pub fn with_n_classes(mut self, n_classes: usize) -> Self {
        self.n_classes = n_classes;
        self
    }

    /// Number of classes (columns of [`predict_proba`](Self::predict_proba)).
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Number of trees requested.
    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    /// Per-split feature budget.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    /// Returns true once the forest has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Fitted trees.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTreeClassifier] {
        &self.trees
    }

    /// Fits the forest to class labels.
    ///
    /// # Errors
    ///
    /// Returns an error for zero trees, mismatched or empty inputs, or a label
    /// outside a class count fixed by [`with_n_classes`](Self::with_n_classes).
    pub fn fit(&mut self, x: &Matrix<f64>, y: &[usize]) -> Result<()> {
        validate_n_estimators(self.n_estimators)?;
        super::validate_fit_inputs(x, y.len())?;

        let observed = y.iter().max().map_or(0, |&m| m + 1);
        if self.n_classes == 0 {
            self.n_classes = observed;
        } else if observed > self.n_classes {
            return Err(VaxError::Schema {
                field: "class label".to_string(),
                reason: format!(
                    "contains {}, expected labels below {}",
                    observed - 1,
                    self.n_classes
                ),
            });
        }

        let n_samples = x.n_rows();
        let n_classes = self.n_classes;
        let base_seed = self.random_state;
        let template = {
            let tree = DecisionTreeClassifier::new()
                .with_min_samples_split(self.min_samples_split)
                .with_max_features(self.max_features);
            match self.max_depth {
                Some(depth) => tree.with_max_depth(depth),
                None => tree,
            }
        };

        let trees: Vec<DecisionTreeClassifier> = (0..self.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(i as u64));
                let indices = bootstrap_sample(n_samples, &mut rng);
                let mut tree = template.clone();
                tree.fit_indices(x, y, &indices, n_classes, &mut rng);
                tree
            })
            .collect();

        debug!(
            n_trees = trees.len(),
            n_samples,
            n_classes,
            max_depth = ?self.max_depth,
            max_features = ?self.max_features,
            "fitted random forest classifier"
        );

        self.n_features = x.n_cols();
        self.trees = trees;
        Ok(())
    }

    /// Mean leaf class distribution for one standardized row; sums to 1.0.
    ///
    /// # Panics
    ///
    /// Panics if the model hasn't been fitted yet.
    #[must_use]
    pub fn predict_proba_row(&self, row: &[f64]) -> Vec<f64> {
        assert!(
            self.is_fitted(),
            "Cannot predict with an unfitted Random Forest. Call fit() first."
        );
        let mut total = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (t, p) in total.iter_mut().zip(tree.predict_proba_row(row)) {
                *t += p;
            }
        }
        let n_trees = self.trees.len() as f64;
        total.into_iter().map(|t| t / n_trees).collect()
    }

    /// Predict class probabilities, shape `(n_samples, n_classes)`.
    ///
    /// # Panics
    ///
    /// Panics if the model hasn't been fitted yet.
    #[must_use]
    pub fn predict_proba(&self, x: &Matrix<f64>) -> Matrix<f64> {
        let data: Vec<f64> = (0..x.n_rows())
            .flat_map(|i| self.predict_proba_row(x.row_slice(i)))
            .collect();
        Matrix::from_vec(x.n_rows(), self.n_classes, data)
            .expect("one probability per class per row")
    }

    /// Most probable class per row; ties go to the lower class index.
    ///
    /// # Panics
    ///
    /// Panics if the model hasn't been fitted yet.
    #[must_use]
    pub fn predict(&self, x: &Matrix<f64>) -> Vec<usize> {
        (0..x.n_rows())
            .map(|i| argmax(&self.predict_proba_row(x.row_slice(i))))
            .collect()
    }

    /// Calculates accuracy score on test data.
    #[must_use]
    pub fn score(&self, x: &Matrix<f64>, y: &[usize]) -> f64 {
        crate::metrics::classification::accuracy(&self.predict(x), y)
    }

    /// Returns mean-decrease-in-impurity importances summing to 1.0.
    ///
    /// Returns `None` before fit.
    #[must_use]
    pub fn feature_importances(&self) -> Option<Vec<f64>> {
        if !self.is_fitted() {
            return None;
        }
        Some(forest_importances(
            self.trees.iter().map(DecisionTreeClassifier::raw_importances),
            self.n_features,
        ))
    }
}

impl Default for RandomForestClassifier {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Index of the largest value; ties go to the lower index.
pub(crate) fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best, best_v), (i, &v)| {
            if v > best_v {
                (i, v)
            } else {
                (best, best_v)
            }
        })
        .0
}
