//! Classification metrics for the waste-risk classifier.
//!
//! Labels are class indices `0..n_classes`. The class count is passed in
//! explicitly so a held-out partition that never sees a class still gets a
//! full-sized report and a square confusion matrix.

use crate::primitives::Matrix;
use serde::Serialize;
use std::fmt;

/// Averaging strategy for multi-class metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Average {
    /// Calculate metrics for each label, return unweighted mean.
    Macro,
    /// Calculate metrics globally by counting total TP, FP, FN.
    Micro,
    /// Weighted mean by support (number of true instances per label).
    Weighted,
}

/// Compute classification accuracy.
///
/// accuracy = `correct_predictions` / `total_predictions`
///
/// # Panics
///
/// Panics if slices have different lengths or are empty.
///
/// # Examples
///
/// ```
/// use vaxflow::metrics::classification::accuracy;
///
/// let y_true = vec![0, 1, 2, 0, 1, 2];
/// let y_pred = vec![0, 2, 1, 0, 0, 1];
/// let acc = accuracy(&y_pred, &y_true);
/// assert!((acc - 0.333333).abs() < 0.001);
/// ```
#[must_use]
pub fn accuracy(y_pred: &[usize], y_true: &[usize]) -> f64 {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");
    assert!(!y_true.is_empty(), "Vectors cannot be empty");

    let correct = y_pred
        .iter()
        .zip(y_true.iter())
        .filter(|(p, t)| p == t)
        .count();

    correct as f64 / y_true.len() as f64
}

/// Compute precision score over `n_classes` classes.
///
/// precision = TP / (TP + FP)
///
/// # Panics
///
/// Panics if slices have different lengths, are empty, or hold a label
/// `>= n_classes`.
///
/// ```
/// use vaxflow::metrics::classification::{precision, Average};
///
/// let y_true = vec![0, 1, 2, 0, 1, 2];
/// let y_pred = vec![0, 2, 1, 0, 0, 1];
/// let prec = precision(&y_pred, &y_true, 3, Average::Macro);
/// assert!((0.0..=1.0).contains(&prec));
/// ```
#[must_use]
pub fn precision(y_pred: &[usize], y_true: &[usize], n_classes: usize, average: Average) -> f64 {
    let counts = ClassCounts::tally(y_pred, y_true, n_classes);
    counts.average(average, |tp, fp, _| class_precision(tp, fp))
}

/// Compute recall score over `n_classes` classes.
///
/// recall = TP / (TP + FN)
///
/// # Panics
///
/// Panics if slices have different lengths, are empty, or hold a label
/// `>= n_classes`.
#[must_use]
pub fn recall(y_pred: &[usize], y_true: &[usize], n_classes: usize, average: Average) -> f64 {
    let counts = ClassCounts::tally(y_pred, y_true, n_classes);
    counts.average(average, |tp, _, fn_count| class_recall(tp, fn_count))
}

/// Compute F1 score (harmonic mean of precision and recall).
///
/// # Panics
///
/// Panics if slices have different lengths, are empty, or hold a label
/// `>= n_classes`.
///
/// ```
/// use vaxflow::metrics::classification::{f1_score, Average};
///
/// let y = vec![0, 1, 2, 2];
/// assert!((f1_score(&y, &y, 3, Average::Weighted) - 1.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn f1_score(y_pred: &[usize], y_true: &[usize], n_classes: usize, average: Average) -> f64 {
    let counts = ClassCounts::tally(y_pred, y_true, n_classes);
    counts.average(average, class_f1)
}

/// Compute the `n_classes x n_classes` confusion matrix.
///
/// Element `[i, j]` counts samples with true label `i` predicted as `j`.
///
/// # Panics
///
/// Panics if slices have different lengths, are empty, or hold a label
/// `>= n_classes`.
///
/// ```
/// use vaxflow::metrics::classification::confusion_matrix;
///
/// let y_true = vec![0, 0, 1, 1];
/// let y_pred = vec![0, 1, 1, 1];
/// let cm = confusion_matrix(&y_pred, &y_true, 3);
/// assert_eq!(cm.shape(), (3, 3));
/// assert_eq!(cm.get(0, 1), 1);
/// ```
#[must_use]
pub fn confusion_matrix(y_pred: &[usize], y_true: &[usize], n_classes: usize) -> Matrix<usize> {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");
    assert!(!y_true.is_empty(), "Vectors cannot be empty");

    let mut data = vec![0usize; n_classes * n_classes];
    for (&true_label, &pred_label) in y_true.iter().zip(y_pred.iter()) {
        assert!(
            true_label < n_classes && pred_label < n_classes,
            "Label out of range"
        );
        data[true_label * n_classes + pred_label] += 1;
    }

    Matrix::from_vec(n_classes, n_classes, data)
        .expect("Confusion matrix dimensions match data length")
}

/// Per-class precision/recall/F1 for one label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassScores {
    /// Display name of the class
    pub label: String,
    /// TP / (TP + FP)
    pub precision: f64,
    /// TP / (TP + FN)
    pub recall: f64,
    /// Harmonic mean of precision and recall
    pub f1: f64,
    /// Number of true instances
    pub support: usize,
}

/// Full classification report over a held-out partition.
///
/// ```
/// use vaxflow::metrics::classification::ClassificationReport;
///
/// let y_true = vec![0, 1, 2, 2];
/// let y_pred = vec![0, 1, 2, 1];
/// let report = ClassificationReport::new(&y_pred, &y_true, &["Low", "Medium", "High"]);
/// assert_eq!(report.classes.len(), 3);
/// assert_eq!(report.accuracy, 0.75);
/// println!("{report}");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    /// One entry per class, in class-index order
    pub classes: Vec<ClassScores>,
    /// Fraction of correct predictions
    pub accuracy: f64,
    /// Unweighted mean precision
    pub macro_precision: f64,
    /// Unweighted mean recall
    pub macro_recall: f64,
    /// Unweighted mean F1
    pub macro_f1: f64,
    /// Support-weighted mean precision
    pub weighted_precision: f64,
    /// Support-weighted mean recall
    pub weighted_recall: f64,
    /// Support-weighted mean F1
    pub weighted_f1: f64,
}

impl ClassificationReport {
    /// Builds the report; `labels.len()` fixes the number of classes.
    ///
    /// # Panics
    ///
    /// Panics if slices have different lengths, are empty, or hold a label
    /// index outside `labels`.
    #[must_use]
    pub fn new(y_pred: &[usize], y_true: &[usize], labels: &[&str]) -> Self {
        let counts = ClassCounts::tally(y_pred, y_true, labels.len());

        let classes = labels
            .iter()
            .enumerate()
            .map(|(i, label)| ClassScores {
                label: (*label).to_string(),
                precision: class_precision(counts.tp[i], counts.fp[i]),
                recall: class_recall(counts.tp[i], counts.fn_counts[i]),
                f1: class_f1(counts.tp[i], counts.fp[i], counts.fn_counts[i]),
                support: counts.support[i],
            })
            .collect();

        Self {
            classes,
            accuracy: accuracy(y_pred, y_true),
            macro_precision: counts.average(Average::Macro, |tp, fp, _| class_precision(tp, fp)),
            macro_recall: counts.average(Average::Macro, |tp, _, f| class_recall(tp, f)),
            macro_f1: counts.average(Average::Macro, class_f1),
            weighted_precision: counts
                .average(Average::Weighted, |tp, fp, _| class_precision(tp, fp)),
            weighted_recall: counts.average(Average::Weighted, |tp, _, f| class_recall(tp, f)),
            weighted_f1: counts.average(Average::Weighted, class_f1),
        }
    }

    /// Total number of evaluated samples.
    #[must_use]
    pub fn total_support(&self) -> usize {
        self.classes.iter().map(|c| c.support).sum()
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                c.label, c.precision, c.recall, c.f1, c.support
            )?;
        }
        let total = self.total_support();
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy", "", "", self.accuracy, total
        )?;
        writeln!(
            f,
            "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
            "macro avg", self.macro_precision, self.macro_recall, self.macro_f1, total
        )?;
        write!(
            f,
            "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
            "weighted avg", self.weighted_precision, self.weighted_recall, self.weighted_f1, total
        )
    }
}

/// Compute precision for a class given true positives and false positives.
fn class_precision(tp: usize, fp: usize) -> f64 {
    if tp + fp == 0 {
        0.0
    } else {
        tp as f64 / (tp + fp) as f64
    }
}

/// Compute recall for a class given true positives and false negatives.
fn class_recall(tp: usize, fn_count: usize) -> f64 {
    if tp + fn_count == 0 {
        0.0
    } else {
        tp as f64 / (tp + fn_count) as f64
    }
}

fn f1_from_prec_rec(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

fn class_f1(tp: usize, fp: usize, fn_count: usize) -> f64 {
    f1_from_prec_rec(class_precision(tp, fp), class_recall(tp, fn_count))
}

/// Per-class TP, FP, FN and support.
struct ClassCounts {
    tp: Vec<usize>,
    fp: Vec<usize>,
    fn_counts: Vec<usize>,
    support: Vec<usize>,
}

impl ClassCounts {
    fn tally(y_pred: &[usize], y_true: &[usize], n_classes: usize) -> Self {
        assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");
        assert!(!y_true.is_empty(), "Vectors cannot be empty");

        let mut counts = Self {
            tp: vec![0; n_classes],
            fp: vec![0; n_classes],
            fn_counts: vec![0; n_classes],
            support: vec![0; n_classes],
        };

        for (&true_label, &pred_label) in y_true.iter().zip(y_pred.iter()) {
            assert!(
                true_label < n_classes && pred_label < n_classes,
                "Label out of range"
            );
            counts.support[true_label] += 1;
            if true_label == pred_label {
                counts.tp[true_label] += 1;
            } else {
                counts.fp[pred_label] += 1;
                counts.fn_counts[true_label] += 1;
            }
        }
        counts
    }

    fn n_classes(&self) -> usize {
        self.tp.len()
    }

    /// Applies `score(tp, fp, fn)` per class (or globally for micro) and averages.
    fn average<F>(&self, average: Average, score: F) -> f64
    where
        F: Fn(usize, usize, usize) -> f64,
    {
        let n = self.n_classes();
        if n == 0 {
            return 0.0;
        }
        match average {
            Average::Micro => score(
                self.tp.iter().sum(),
                self.fp.iter().sum(),
                self.fn_counts.iter().sum(),
            ),
            Average::Macro => {
                (0..n)
                    .map(|i| score(self.tp[i], self.fp[i], self.fn_counts[i]))
                    .sum::<f64>()
                    / n as f64
            }
            Average::Weighted => {
                let total: usize = self.support.iter().sum();
                if total == 0 {
                    return 0.0;
                }
                (0..n)
                    .map(|i| {
                        score(self.tp[i], self.fp[i], self.fn_counts[i]) * self.support[i] as f64
                            / total as f64
                    })
                    .sum()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABELS: [&str; 3] = ["Low", "Medium", "High"];

    #[test]
    fn test_accuracy_perfect() {
        let y = vec![0, 1, 2, 1];
        assert_eq!(accuracy(&y, &y), 1.0);
    }

    #[test]
    fn test_micro_precision_equals_accuracy() {
        let y_true = vec![0, 1, 2, 0, 1, 2];
        let y_pred = vec![0, 2, 1, 0, 0, 1];
        let micro = precision(&y_pred, &y_true, 3, Average::Micro);
        assert!((micro - accuracy(&y_pred, &y_true)).abs() < 1e-12);
    }

    #[test]
    fn test_per_class_scores() {
        // class 0: tp=2 fp=1 fn=0; class 1: tp=0 fp=1 fn=2; class 2: tp=1 fp=0 fn=0
        let y_true = vec![0, 0, 1, 1, 2];
        let y_pred = vec![0, 0, 0, 2, 2];
        let report = ClassificationReport::new(&y_pred, &y_true, &LABELS);
        let low = &report.classes[0];
        assert!((low.precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(low.recall, 1.0);
        assert_eq!(low.support, 2);
        assert_eq!(report.classes[1].f1, 0.0);
        assert!((report.classes[2].precision - 0.5).abs() < 1e-12);
        assert_eq!(report.total_support(), 5);
    }

    #[test]
    fn test_absent_class_keeps_full_report() {
        let y_true = vec![0, 0, 1];
        let y_pred = vec![0, 0, 1];
        let report = ClassificationReport::new(&y_pred, &y_true, &LABELS);
        assert_eq!(report.classes.len(), 3);
        assert_eq!(report.classes[2].support, 0);
        assert_eq!(report.classes[2].precision, 0.0);
        assert_eq!(report.weighted_f1, 1.0);
        assert!(report.macro_f1 < 1.0);
    }

    #[test]
    fn test_confusion_matrix_counts() {
        let y_true = vec![0, 0, 1, 1, 2, 2];
        let y_pred = vec![0, 1, 1, 1, 2, 0];
        let cm = confusion_matrix(&y_pred, &y_true, 3);
        assert_eq!(cm.get(0, 0), 1);
        assert_eq!(cm.get(0, 1), 1);
        assert_eq!(cm.get(1, 1), 2);
        assert_eq!(cm.get(2, 0), 1);
        assert_eq!(cm.as_slice().iter().sum::<usize>(), 6);
    }

    #[test]
    #[should_panic(expected = "Label out of range")]
    fn test_label_out_of_range() {
        let _ = confusion_matrix(&[3], &[0], 3);
    }

    #[test]
    fn test_report_display_has_rows() {
        let y = vec![0, 1, 2];
        let text = ClassificationReport::new(&y, &y, &LABELS).to_string();
        assert!(text.contains("Medium"));
        assert!(text.contains("macro avg"));
        assert!(text.contains("weighted avg"));
    }
}
