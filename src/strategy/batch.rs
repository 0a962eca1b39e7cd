//! Batch Runner.
//!
//! Evaluates many areas against one processor and model pair. Rows are
//! independent: a malformed row yields an error in its own [`BatchRow`] and
//! every other row is still evaluated. Rows run in parallel on the rayon
//! pool; output order always equals input order.

use super::{StrategyEngine, StrategyResult};
use crate::data::{DataFrame, FieldMap, RiskLevel};
use crate::error::Result;
use crate::preprocessing::FeatureProcessor;
use crate::trainer::ModelPair;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

/// Result of one input row.
#[derive(Debug)]
pub struct BatchRow {
    /// Index of the row in the input
    pub area_id: usize,
    /// Strategy for the row, or why it could not be evaluated
    pub outcome: Result<StrategyResult>,
}

impl BatchRow {
    /// True if the row was evaluated.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Compact projection of a successful row, with reported rounding.
    #[must_use]
    pub fn summary(&self) -> Option<BatchSummary> {
        self.outcome.as_ref().ok().map(|r| BatchSummary {
            area_id: self.area_id,
            predicted_demand: r.reported_demand(),
            waste_risk: r.waste_risk,
            confidence: r.reported_confidence(),
        })
    }
}

/// One line of a batch overview.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Input row index
    #[serde(rename = "Area_ID")]
    pub area_id: usize,
    /// Forecast doses per day, to 2 decimals
    #[serde(rename = "Predicted_Demand")]
    pub predicted_demand: f64,
    /// Most probable risk level
    #[serde(rename = "Waste_Risk")]
    pub waste_risk: RiskLevel,
    /// Probability of the predicted level, to 4 decimals
    #[serde(rename = "Confidence")]
    pub confidence: f64,
}

/// Totals over a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    /// Rows evaluated successfully
    pub evaluated: usize,
    /// Rows that failed
    pub failed: usize,
    /// Sum of predicted demand over evaluated rows
    pub total_predicted_demand: f64,
    /// Evaluated rows per risk level, indexed by [`RiskLevel::index`]
    pub per_level: [usize; RiskLevel::N_CLASSES],
}

impl BatchReport {
    /// Summarizes `rows`.
    #[must_use]
    pub fn aggregate(rows: &[BatchRow]) -> Self {
        let mut report = Self {
            evaluated: 0,
            failed: 0,
            total_predicted_demand: 0.0,
            per_level: [0; RiskLevel::N_CLASSES],
        };
        for row in rows {
            match &row.outcome {
                Ok(result) => {
                    report.evaluated += 1;
                    report.total_predicted_demand += result.predicted_demand;
                    report.per_level[result.waste_risk.index()] += 1;
                }
                Err(_) => report.failed += 1,
            }
        }
        report
    }

    /// Evaluated rows at `level`.
    #[must_use]
    pub fn count(&self, level: RiskLevel) -> usize {
        self.per_level[level.index()]
    }
}

impl StrategyEngine {
    /// Evaluates every mapping, fail-soft per row, preserving order.
    #[must_use]
    pub fn evaluate_batch(
        &self,
        rows: &[FieldMap],
        processor: &FeatureProcessor,
        models: &ModelPair,
    ) -> Vec<BatchRow> {
        debug!(n_rows = rows.len(), "evaluating batch");
        rows.par_iter()
            .enumerate()
            .map(|(area_id, fields)| {
                let outcome = self.evaluate_mapping(fields, processor, models);
                if let Err(err) = &outcome {
                    warn!(area_id, error = %err, "batch row failed");
                }
                BatchRow { area_id, outcome }
            })
            .collect()
    }

    /// Evaluates every row of a table. Non-finite cells count as missing.
    #[must_use]
    pub fn evaluate_frame(
        &self,
        df: &DataFrame,
        processor: &FeatureProcessor,
        models: &ModelPair,
    ) -> Vec<BatchRow> {
        self.evaluate_batch(&frame_rows(df), processor, models)
    }
}

fn frame_rows(df: &DataFrame) -> Vec<FieldMap> {
    (0..df.n_rows())
        .map(|i| {
            df.iter_columns()
                .filter(|(_, column)| column[i].is_finite())
                .map(|(name, column)| (name.to_string(), column[i]))
                .collect()
        })
        .collect()
}

/// Evaluates every mapping with the default engine.
#[must_use]
pub fn evaluate_batch(
    rows: &[FieldMap],
    processor: &FeatureProcessor,
    models: &ModelPair,
) -> Vec<BatchRow> {
    StrategyEngine::new().evaluate_batch(rows, processor, models)
}

/// Evaluates every table row with the default engine.
#[must_use]
pub fn evaluate_frame(
    df: &DataFrame,
    processor: &FeatureProcessor,
    models: &ModelPair,
) -> Vec<BatchRow> {
    StrategyEngine::new().evaluate_frame(df, processor, models)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainerConfig;
    use crate::data::{AreaRecord, Feature};
    use crate::error::VaxError;
    use crate::primitives::Vector;
    use crate::synthetic::{generate, generate_areas};
    use crate::trainer::DualModelTrainer;

    fn trained() -> (FeatureProcessor, ModelPair) {
        let df = generate(200, 42).expect("generate");
        let pipeline = DualModelTrainer::new(TrainerConfig::default().with_n_estimators(10))
            .train(&df)
            .expect("train");
        let (processor, models, _) = pipeline.into_parts();
        (processor, models)
    }

    #[test]
    fn test_batch_preserves_order_and_ids() {
        let (processor, models) = trained();
        let areas = generate_areas(10, 7).expect("areas");
        let rows: Vec<FieldMap> = areas.iter().map(AreaRecord::to_mapping).collect();

        let out = evaluate_batch(&rows, &processor, &models);
        assert_eq!(out.len(), 10);
        for (i, (row, area)) in out.iter().zip(&areas).enumerate() {
            assert_eq!(row.area_id, i);
            let single = StrategyEngine::new()
                .evaluate(area, &processor, &models)
                .expect("single");
            assert_eq!(row.outcome.as_ref().expect("row ok"), &single);
        }
    }

    #[test]
    fn test_batch_is_fail_soft() {
        let (processor, models) = trained();
        let mut rows: Vec<FieldMap> = generate_areas(5, 1)
            .expect("areas")
            .iter()
            .map(AreaRecord::to_mapping)
            .collect();
        rows[2].remove(Feature::DistanceFromHub.name());

        let out = evaluate_batch(&rows, &processor, &models);
        assert_eq!(out.len(), 5);
        assert!(out[2].outcome.as_ref().expect_err("row 2").is_schema());
        assert!(out.iter().enumerate().all(|(i, r)| i == 2 || r.is_ok()));
        assert!(out[2].summary().is_none());

        let report = BatchReport::aggregate(&out);
        assert_eq!(report.evaluated, 4);
        assert_eq!(report.failed, 1);
        assert_eq!(report.per_level.iter().sum::<usize>(), 4);
    }

    #[test]
    fn test_batch_with_foreign_processor_fails_every_row() {
        let (_, models) = trained();
        let rows = vec![AreaRecord::from_array([1e4, 0.5, 100.0, 1.0, 50.0, 0.5, 100.0])
            .to_mapping()];
        let out = evaluate_batch(&rows, &FeatureProcessor::new(), &models);
        assert!(matches!(out[0].outcome, Err(VaxError::UnfittedState { .. })));
    }

    #[test]
    fn test_empty_batch() {
        let (processor, models) = trained();
        assert!(evaluate_batch(&[], &processor, &models).is_empty());
        let report = BatchReport::aggregate(&[]);
        assert_eq!(report.evaluated + report.failed, 0);
    }

    #[test]
    fn test_evaluate_frame_treats_nan_as_missing() {
        let (processor, models) = trained();
        let areas = generate_areas(4, 11).expect("areas");
        let mut df = DataFrame::from_records(&areas).expect("frame");
        let mut awareness: Vec<f64> = areas.iter().map(|a| a.awareness).collect();
        awareness[1] = f64::NAN;
        let mut columns: Vec<(String, Vector<f64>)> = df
            .iter_columns()
            .filter(|(n, _)| *n != Feature::Awareness.name())
            .map(|(n, v)| (n.to_string(), v.clone()))
            .collect();
        columns.push((
            Feature::Awareness.name().to_string(),
            Vector::from_vec(awareness),
        ));
        df = DataFrame::new(columns).expect("frame");

        let out = evaluate_frame(&df, &processor, &models);
        assert_eq!(out.len(), 4);
        let err = out[1].outcome.as_ref().expect_err("nan row");
        assert!(err.to_string().contains("Awareness"));
        assert!(out[0].is_ok() && out[2].is_ok() && out[3].is_ok());
    }

    #[test]
    fn test_summary_projection() {
        let (processor, models) = trained();
        let rows = vec![generate_areas(1, 3).expect("areas")[0].to_mapping()];
        let out = evaluate_batch(&rows, &processor, &models);
        let summary = out[0].summary().expect("ok row");
        let result = out[0].outcome.as_ref().expect("ok row");
        assert_eq!(summary.area_id, 0);
        assert_eq!(summary.predicted_demand, result.reported_demand());
        assert_eq!(summary.confidence, result.reported_confidence());
        assert!((summary.predicted_demand - result.predicted_demand).abs() <= 0.005);

        let value = serde_json::to_value(summary).expect("serialize");
        let full = serde_json::to_value(result).expect("serialize");
        assert_eq!(value["Area_ID"], 0);
        assert_eq!(value["Waste_Risk"], result.waste_risk.label());
        assert_eq!(value["Predicted_Demand"], full["Predicted_Demand"]);
        assert_eq!(value["Confidence"], full["Confidence_Score"]);
    }
}
