//! Decision tree algorithms and ensemble methods.
//!
//! This module implements:
//! - CART regression trees (squared-error criterion)
//! - CART classification trees (Gini impurity)
//! - Random Forest regressor and classifier over bootstrap samples
//!
//! Every internal node records the impurity decrease its split achieved, which
//! feeds the mean-decrease-in-impurity feature importances of the forests.
//! Classification leaves keep their class counts, so a tree yields a class
//! distribution and not just a label.
//!
//! # Example
//!
//! ```
//! use vaxflow::prelude::*;
//! use vaxflow::tree::DecisionTreeClassifier;
//!
//! let x = Matrix::from_vec(4, 2, vec![
//!     0.0, 0.0,  // class 0
//!     0.0, 1.0,  // class 0
//!     1.0, 0.0,  // class 1
//!     1.0, 1.0,  // class 1
//! ]).expect("valid matrix");
//! let y = vec![0, 0, 1, 1];
//!
//! let mut tree = DecisionTreeClassifier::new().with_max_depth(3);
//! tree.fit(&x, &y).expect("fit should succeed");
//! assert_eq!(tree.predict(&x), y);
//! ```

mod helpers;
mod random_forest;

pub use random_forest::{RandomForestClassifier, RandomForestRegressor};
pub(crate) use random_forest::argmax;

use crate::error::{Result, VaxError};
use crate::primitives::{Matrix, Vector};
use helpers::{
    at_max_depth, best_gini_split, best_regression_split, class_counts, gini_from_counts,
    majority_class, mean_at, partition_by_threshold, sum_squared_error, FeatureDraw,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// How many features each split considers.
///
/// ```
/// use vaxflow::tree::MaxFeatures;
///
/// assert_eq!(MaxFeatures::All.resolve(7), 7);
/// assert_eq!(MaxFeatures::Sqrt.resolve(7), 2);
/// assert_eq!(MaxFeatures::Count(10).resolve(7), 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// Every feature at every split
    #[default]
    All,
    /// `floor(sqrt(n_features))`, at least 1
    Sqrt,
    /// A fixed count, clamped to `1..=n_features`
    Count(usize),
}

impl MaxFeatures {
    /// Number of features a split inspects out of `n_features`.
    #[must_use]
    pub fn resolve(self, n_features: usize) -> usize {
        let k = match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => (n_features as f64).sqrt() as usize,
            MaxFeatures::Count(k) => k,
        };
        k.clamp(1, n_features.max(1))
    }
}

/// Internal node in a classification tree.
///
/// Contains a split condition (feature and threshold) and pointers to
/// left and right subtrees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Index of the feature to split on
    pub feature_idx: usize,
    /// Threshold value for the split
    pub threshold: f64,
    /// Sample-weighted Gini decrease achieved by this split
    pub impurity_decrease: f64,
    /// Left subtree (samples where feature <= threshold)
    pub left: Box<TreeNode>,
    /// Right subtree (samples where feature > threshold)
    pub right: Box<TreeNode>,
}

/// Leaf node in a classification tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leaf {
    /// Predicted class label for this leaf
    pub class_label: usize,
    /// Number of training samples in this leaf
    pub n_samples: usize,
    /// Training samples per class; sums to `n_samples`
    pub class_counts: Vec<usize>,
}

impl Leaf {
    /// Class fractions of the training samples that reached this leaf.
    #[must_use]
    pub fn class_distribution(&self) -> Vec<f64> {
        let n = self.n_samples as f64;
        self.class_counts.iter().map(|&c| c as f64 / n).collect()
    }
}

/// A node in a classification tree (either internal node or leaf).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Internal decision node with split condition
    Node(Node),
    /// Leaf node with class prediction
    Leaf(Leaf),
}

impl TreeNode {
    /// Returns the depth of the tree rooted at this node.
    ///
    /// Leaf nodes have depth 0, internal nodes have depth 1 + max(left, right).
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf(_) => 0,
            TreeNode::Node(node) => 1 + node.left.depth().max(node.right.depth()),
        }
    }

    fn leaf_for(&self, row: &[f64]) -> &Leaf {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf(leaf) => return leaf,
                TreeNode::Node(n) => {
                    node = if row[n.feature_idx] <= n.threshold {
                        &n.left
                    } else {
                        &n.right
                    };
                }
            }
        }
    }

    fn accumulate_importances(&self, importances: &mut [f64]) {
        if let TreeNode::Node(n) = self {
            importances[n.feature_idx] += n.impurity_decrease;
            n.left.accumulate_importances(importances);
            n.right.accumulate_importances(importances);
        }
    }
}

/// Leaf node in a regression tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionLeaf {
    /// Predicted value for this leaf (mean of y values)
    pub value: f64,
    /// Number of training samples in this leaf
    pub n_samples: usize,
}

/// Internal node in a regression tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionNode {
    /// Index of the feature to split on
    pub feature_idx: usize,
    /// Threshold value for the split
    pub threshold: f64,
    /// Reduction in summed squared error achieved by this split
    pub impurity_decrease: f64,
    /// Left subtree (samples where feature <= threshold)
    pub left: Box<RegressionTreeNode>,
    /// Right subtree (samples where feature > threshold)
    pub right: Box<RegressionTreeNode>,
}

/// A node in a regression tree (either internal node or leaf).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RegressionTreeNode {
    /// Internal decision node with split condition
    Node(RegressionNode),
    /// Leaf node with value prediction
    Leaf(RegressionLeaf),
}

impl RegressionTreeNode {
    /// Returns the depth of the tree rooted at this node.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            RegressionTreeNode::Leaf(_) => 0,
            RegressionTreeNode::Node(node) => 1 + node.left.depth().max(node.right.depth()),
        }
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                RegressionTreeNode::Leaf(leaf) => return leaf.value,
                RegressionTreeNode::Node(n) => {
                    node = if row[n.feature_idx] <= n.threshold {
                        &n.left
                    } else {
                        &n.right
                    };
                }
            }
        }
    }

    fn accumulate_importances(&self, importances: &mut [f64]) {
        if let RegressionTreeNode::Node(n) = self {
            importances[n.feature_idx] += n.impurity_decrease;
            n.left.accumulate_importances(importances);
            n.right.accumulate_importances(importances);
        }
    }
}

/// Shared growth limits for both tree kinds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct GrowthLimits {
    max_depth: Option<usize>,
    min_samples_split: usize,
    max_features: MaxFeatures,
}

impl Default for GrowthLimits {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            max_features: MaxFeatures::All,
        }
    }
}

fn validate_fit_inputs(x: &Matrix<f64>, n_targets: usize) -> Result<()> {
    let n_rows = x.n_rows();
    if n_rows != n_targets {
        return Err(VaxError::Schema {
            field: "target".to_string(),
            reason: format!("has {n_targets} rows, features have {n_rows}"),
        });
    }
    if n_rows == 0 {
        return Err(VaxError::InsufficientData {
            context: "tree fit".to_string(),
            required: 1,
            actual: 0,
        });
    }
    Ok(())
}

/// Decision tree regressor using the CART algorithm.
///
/// Splits minimize the summed squared error of the children; leaves predict
/// the mean target of their training samples.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    tree: Option<RegressionTreeNode>,
    limits: GrowthLimits,
    random_state: u64,
    n_features: usize,
}

impl DecisionTreeRegressor {
    /// Creates a new decision tree regressor with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum depth of the tree (root has depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.limits.max_depth = Some(depth);
        self
    }

    /// Sets the minimum number of samples required to split an internal node.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.limits.min_samples_split = min_samples.max(2);
        self
    }

    /// Sets how many features each split considers.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.limits.max_features = max_features;
        self
    }

    /// Seeds the per-split feature draws of [`fit`](Self::fit).
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    /// Fits the decision tree to training data.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` and `y` disagree on row count or are empty.
    pub fn fit(&mut self, x: &Matrix<f64>, y: &Vector<f64>) -> Result<()> {
        validate_fit_inputs(x, y.len())?;
        let indices: Vec<usize> = (0..x.n_rows()).collect();
        let mut rng = StdRng::seed_from_u64(self.random_state);
        self.fit_indices(x, y.as_slice(), &indices, &mut rng);
        Ok(())
    }

    /// Fits on the rows of `x` named by `indices` (repeats allowed).
    pub(crate) fn fit_indices(
        &mut self,
        x: &Matrix<f64>,
        y: &[f64],
        indices: &[usize],
        rng: &mut StdRng,
    ) {
        self.n_features = x.n_cols();
        let mut grower = Grower::new(x, self.limits, rng);
        self.tree = Some(grower.regression_node(y, indices, 0));
    }

    /// Returns true once the tree has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.tree.is_some()
    }

    /// Depth of the fitted tree.
    #[must_use]
    pub fn depth(&self) -> Option<usize> {
        self.tree.as_ref().map(RegressionTreeNode::depth)
    }

    /// Predicts target values for samples.
    ///
    /// # Panics
    ///
    /// Panics if called before fit()
    #[must_use]
    pub fn predict(&self, x: &Matrix<f64>) -> Vector<f64> {
        let tree = self.root();
        Vector::from_vec((0..x.n_rows()).map(|i| tree.predict_row(x.row_slice(i))).collect())
    }

    pub(crate) fn predict_row(&self, row: &[f64]) -> f64 {
        self.root().predict_row(row)
    }

    /// Unnormalized impurity decrease per feature.
    pub(crate) fn raw_importances(&self) -> Vec<f64> {
        let mut importances = vec![0.0; self.n_features];
        if let Some(tree) = &self.tree {
            tree.accumulate_importances(&mut importances);
        }
        importances
    }

    fn root(&self) -> &RegressionTreeNode {
        self.tree
            .as_ref()
            .expect("Cannot predict with an unfitted tree. Call fit() first.")
    }
}

/// Recursive tree growth over one training matrix.
///
/// Nodes are grown depth-first, left before right, and each node that
/// searches for a split draws its feature order from `rng`.
struct Grower<'a> {
    x: &'a Matrix<f64>,
    limits: GrowthLimits,
    rng: &'a mut StdRng,
}

impl<'a> Grower<'a> {
    fn new(x: &'a Matrix<f64>, limits: GrowthLimits, rng: &'a mut StdRng) -> Self {
        Self { x, limits, rng }
    }

    fn stops_at(&self, n_samples: usize, depth: usize) -> bool {
        n_samples < self.limits.min_samples_split || at_max_depth(depth, self.limits.max_depth)
    }

    fn draw_features(&mut self) -> FeatureDraw {
        FeatureDraw::draw(self.x.n_cols(), self.limits.max_features, &mut *self.rng)
    }

    fn regression_node(
        &mut self,
        y: &[f64],
        indices: &[usize],
        depth: usize,
    ) -> RegressionTreeNode {
        let n_samples = indices.len();
        let make_leaf = || {
            RegressionTreeNode::Leaf(RegressionLeaf {
                value: mean_at(y, indices),
                n_samples,
            })
        };

        if self.stops_at(n_samples, depth) || sum_squared_error(y, indices) < 1e-10 {
            return make_leaf();
        }

        let features = self.draw_features();
        let Some(split) = best_regression_split(self.x, y, indices, &features) else {
            return make_leaf();
        };

        let (left, right) =
            partition_by_threshold(self.x, indices, split.feature_idx, split.threshold);
        if left.is_empty() || right.is_empty() {
            return make_leaf();
        }

        let left = Box::new(self.regression_node(y, &left, depth + 1));
        let right = Box::new(self.regression_node(y, &right, depth + 1));
        RegressionTreeNode::Node(RegressionNode {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            impurity_decrease: split.impurity_decrease,
            left,
            right,
        })
    }

    fn class_node(
        &mut self,
        y: &[usize],
        indices: &[usize],
        n_classes: usize,
        depth: usize,
    ) -> TreeNode {
        let n_samples = indices.len();
        let counts = class_counts(y, indices, n_classes);
        let make_leaf = |counts: Vec<usize>| {
            TreeNode::Leaf(Leaf {
                class_label: majority_class(&counts),
                n_samples,
                class_counts: counts,
            })
        };

        if self.stops_at(n_samples, depth) || gini_from_counts(&counts, n_samples) == 0.0 {
            return make_leaf(counts);
        }

        let features = self.draw_features();
        let Some(split) = best_gini_split(self.x, y, indices, n_classes, &features) else {
            return make_leaf(counts);
        };

        let (left, right) =
            partition_by_threshold(self.x, indices, split.feature_idx, split.threshold);
        if left.is_empty() || right.is_empty() {
            return make_leaf(counts);
        }

        let left = Box::new(self.class_node(y, &left, n_classes, depth + 1));
        let right = Box::new(self.class_node(y, &right, n_classes, depth + 1));
        TreeNode::Node(Node {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            impurity_decrease: split.impurity_decrease,
            left,
            right,
        })
    }
}

/// Decision tree classifier using the CART algorithm with Gini impurity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    tree: Option<TreeNode>,
    limits: GrowthLimits,
    random_state: u64,
    n_features: usize,
}

impl DecisionTreeClassifier {
    /// Creates a new decision tree classifier with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum depth of the tree (root has depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.limits.max_depth = Some(depth);
        self
    }

    /// Sets the minimum number of samples required to split an internal node.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.limits.min_samples_split = min_samples.max(2);
        self
    }

    /// Sets how many features each split considers.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.limits.max_features = max_features;
        self
    }

    /// Seeds the per-split feature draws of [`fit`](Self::fit).
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    /// Fits the decision tree to class labels `0..n_classes`.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` and `y` disagree on row count or are empty.
    pub fn fit(&mut self, x: &Matrix<f64>, y: &[usize]) -> Result<()> {
        validate_fit_inputs(x, y.len())?;
        let n_classes = y.iter().max().map_or(1, |&m| m + 1);
        let indices: Vec<usize> = (0..x.n_rows()).collect();
        let mut rng = StdRng::seed_from_u64(self.random_state);
        self.fit_indices(x, y, &indices, n_classes, &mut rng);
        Ok(())
    }

    /// Fits on the rows of `x` named by `indices` (repeats allowed).
    pub(crate) fn fit_indices(
        &mut self,
        x: &Matrix<f64>,
        y: &[usize],
        indices: &[usize],
        n_classes: usize,
        rng: &mut StdRng,
    ) {
        self.n_features = x.n_cols();
        let mut grower = Grower::new(x, self.limits, rng);
        self.tree = Some(grower.class_node(y, indices, n_classes, 0));
    }

    /// Returns true once the tree has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.tree.is_some()
    }

    /// Depth of the fitted tree.
    #[must_use]
    pub fn depth(&self) -> Option<usize> {
        self.tree.as_ref().map(TreeNode::depth)
    }

    /// Predicts class labels for samples.
    ///
    /// # Panics
    ///
    /// Panics if called before fit()
    #[must_use]
    pub fn predict(&self, x: &Matrix<f64>) -> Vec<usize> {
        let tree = self.root();
        (0..x.n_rows())
            .map(|i| tree.leaf_for(x.row_slice(i)).class_label)
            .collect()
    }

    /// Class fractions of the leaf `row` falls into.
    ///
    /// # Panics
    ///
    /// Panics if called before fit()
    #[must_use]
    pub fn predict_proba_row(&self, row: &[f64]) -> Vec<f64> {
        self.root().leaf_for(row).class_distribution()
    }

    /// Unnormalized impurity decrease per feature.
    pub(crate) fn raw_importances(&self) -> Vec<f64> {
        let mut importances = vec![0.0; self.n_features];
        if let Some(tree) = &self.tree {
            tree.accumulate_importances(&mut importances);
        }
        importances
    }

    fn root(&self) -> &TreeNode {
        self.tree
            .as_ref()
            .expect("Cannot predict with an unfitted tree. Call fit() first.")
    }
}
