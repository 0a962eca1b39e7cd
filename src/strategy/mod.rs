//! Strategy Engine.
//!
//! Turns one Area Record into a demand forecast, a waste-risk level with its
//! class probabilities, and an ordered list of recommendation codes.
//!
//! Recommendations come from a fixed decision table: the demand rule is
//! evaluated first, then the risk rules. Codes are plain enum values;
//! [`RecommendationCode::message`] supplies the display text.
//!
//! # Example
//!
//! ```
//! use vaxflow::config::TrainerConfig;
//! use vaxflow::data::AreaRecord;
//! use vaxflow::strategy::{RecommendationCode, StrategyEngine};
//! use vaxflow::synthetic::generate;
//! use vaxflow::trainer::DualModelTrainer;
//!
//! let df = generate(200, 42).unwrap();
//! let pipeline = DualModelTrainer::new(TrainerConfig::default().with_n_estimators(10))
//!     .train(&df)
//!     .unwrap();
//!
//! let area = AreaRecord::from_array([150_000.0, 0.35, 2500.0, 3.5, 75.0, 0.85, 45.0]);
//! let result = StrategyEngine::new()
//!     .evaluate(&area, pipeline.processor(), pipeline.models())
//!     .unwrap();
//!
//! assert_eq!(result.recommendations[0], RecommendationCode::StandardSupplyChain);
//! assert!((result.probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-9);
//! ```

pub mod batch;

use crate::config::DEFAULT_DEMAND_THRESHOLD;
use crate::data::{AreaRecord, FieldMap, RiskLevel};
use crate::error::Result;
use crate::preprocessing::FeatureProcessor;
use crate::trainer::ModelPair;
use crate::tree::argmax;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::fmt;

/// One actionable recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RecommendationCode {
    /// Forecast demand is above the threshold
    IncreaseShipmentFrequency,
    /// Forecast demand is at or below the threshold
    StandardSupplyChain,
    /// High waste risk
    ColdChainMonitoring,
    /// High waste risk
    BackupPowerDeployment,
    /// Medium waste risk
    MonitorInfrastructure,
    /// Low waste risk
    StandardOperations,
}

impl RecommendationCode {
    /// Display text for operators.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::IncreaseShipmentFrequency => "High demand: increase vaccine shipment frequency",
            Self::StandardSupplyChain => "Moderate demand: standard supply chain",
            Self::ColdChainMonitoring => "High waste risk: implement cold chain monitoring",
            Self::BackupPowerDeployment => "Action: deploy backup power systems",
            Self::MonitorInfrastructure => "Medium waste risk: monitor infrastructure closely",
            Self::StandardOperations => "Low waste risk: standard operations sufficient",
        }
    }
}

impl fmt::Display for RecommendationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Inputs every rule predicate sees.
struct RuleInput {
    demand: f64,
    risk: RiskLevel,
    demand_threshold: f64,
}

struct Rule {
    applies: fn(&RuleInput) -> bool,
    emits: &'static [RecommendationCode],
}

fn high_demand(i: &RuleInput) -> bool {
    i.demand > i.demand_threshold
}

fn moderate_demand(i: &RuleInput) -> bool {
    !high_demand(i)
}

fn high_risk(i: &RuleInput) -> bool {
    i.risk == RiskLevel::High
}

fn medium_risk(i: &RuleInput) -> bool {
    i.risk == RiskLevel::Medium
}

fn low_risk(i: &RuleInput) -> bool {
    i.risk == RiskLevel::Low
}

/// Evaluated top to bottom; every matching rule contributes its codes.
const RULES: [Rule; 5] = [
    Rule {
        applies: high_demand,
        emits: &[RecommendationCode::IncreaseShipmentFrequency],
    },
    Rule {
        applies: moderate_demand,
        emits: &[RecommendationCode::StandardSupplyChain],
    },
    Rule {
        applies: high_risk,
        emits: &[
            RecommendationCode::ColdChainMonitoring,
            RecommendationCode::BackupPowerDeployment,
        ],
    },
    Rule {
        applies: medium_risk,
        emits: &[RecommendationCode::MonitorInfrastructure],
    },
    Rule {
        applies: low_risk,
        emits: &[RecommendationCode::StandardOperations],
    },
];

/// Decimal places of reported demand.
pub const DEMAND_DECIMALS: i32 = 2;

/// Decimal places of reported probabilities and confidence.
pub const PROBABILITY_DECIMALS: i32 = 4;

/// Outcome of evaluating one area.
///
/// Serializes as a mapping with exactly the fields `Predicted_Demand`,
/// `Waste_Risk`, `Waste_Risk_Probabilities`, `Recommendations` and
/// `Confidence_Score`. Every reported form (this mapping, batch summaries,
/// batch CSV) rounds demand to [`DEMAND_DECIMALS`] and probabilities to
/// [`PROBABILITY_DECIMALS`]; the fields themselves stay unrounded.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyResult {
    /// Forecast doses per day
    pub predicted_demand: f64,
    /// Most probable risk level
    pub waste_risk: RiskLevel,
    /// Class probabilities indexed by [`RiskLevel::index`]
    pub probabilities: [f64; RiskLevel::N_CLASSES],
    /// Recommendations in rule order
    pub recommendations: Vec<RecommendationCode>,
    /// Probability of `waste_risk`
    pub confidence: f64,
}

impl StrategyResult {
    /// Probability assigned to `level`.
    #[must_use]
    pub fn probability(&self, level: RiskLevel) -> f64 {
        self.probabilities[level.index()]
    }

    /// True if `code` was recommended.
    #[must_use]
    pub fn recommends(&self, code: RecommendationCode) -> bool {
        self.recommendations.contains(&code)
    }

    /// Demand as reported.
    #[must_use]
    pub fn reported_demand(&self) -> f64 {
        round_to(self.predicted_demand, DEMAND_DECIMALS)
    }

    /// Confidence as reported.
    #[must_use]
    pub fn reported_confidence(&self) -> f64 {
        round_to(self.confidence, PROBABILITY_DECIMALS)
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

struct ProbabilityMap<'a>(&'a [f64; RiskLevel::N_CLASSES]);

impl Serialize for ProbabilityMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(RiskLevel::N_CLASSES))?;
        for level in RiskLevel::ALL {
            let p = round_to(self.0[level.index()], PROBABILITY_DECIMALS);
            map.serialize_entry(level.label(), &p)?;
        }
        map.end()
    }
}

impl Serialize for StrategyResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("StrategyResult", 5)?;
        state.serialize_field("Predicted_Demand", &self.reported_demand())?;
        state.serialize_field("Waste_Risk", self.waste_risk.label())?;
        state.serialize_field(
            "Waste_Risk_Probabilities",
            &ProbabilityMap(&self.probabilities),
        )?;
        state.serialize_field("Recommendations", &self.recommendations)?;
        state.serialize_field("Confidence_Score", &self.reported_confidence())?;
        state.end()
    }
}

/// Applies the recommendation rules to fitted models.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyEngine {
    demand_threshold: f64,
}

impl Default for StrategyEngine {
    fn default() -> Self {
        Self {
            demand_threshold: DEFAULT_DEMAND_THRESHOLD,
        }
    }
}

impl StrategyEngine {
    /// Creates an engine with the default demand threshold of 1000 doses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the demand above which more frequent shipments are recommended.
    #[must_use]
    pub fn with_demand_threshold(mut self, demand_threshold: f64) -> Self {
        self.demand_threshold = demand_threshold;
        self
    }

    /// Current demand threshold.
    #[must_use]
    pub fn demand_threshold(&self) -> f64 {
        self.demand_threshold
    }

    /// Recommendation codes for a forecast, in rule order.
    #[must_use]
    pub fn recommend(&self, demand: f64, risk: RiskLevel) -> Vec<RecommendationCode> {
        let input = RuleInput {
            demand,
            risk,
            demand_threshold: self.demand_threshold,
        };
        RULES
            .iter()
            .filter(|rule| (rule.applies)(&input))
            .flat_map(|rule| rule.emits.iter().copied())
            .collect()
    }

    /// Evaluates one area.
    ///
    /// # Errors
    ///
    /// - `UnfittedState` if `processor` is unfitted
    /// - `ProcessorMismatch` if `models` were trained with another processor
    /// - a schema error for a non-finite feature
    pub fn evaluate(
        &self,
        record: &AreaRecord,
        processor: &FeatureProcessor,
        models: &ModelPair,
    ) -> Result<StrategyResult> {
        models.check_processor(processor)?;
        let x = processor.transform_record(record)?;
        let (predicted_demand, proba) = models.predict_row(x.row_slice(0));

        let probabilities = RiskLevel::ALL.map(|level| proba[level.index()]);
        let waste_risk = RiskLevel::ALL[argmax(&probabilities)];

        Ok(StrategyResult {
            predicted_demand,
            waste_risk,
            probabilities,
            recommendations: self.recommend(predicted_demand, waste_risk),
            confidence: probabilities[waste_risk.index()],
        })
    }

    /// Evaluates one area given as a field-keyed mapping.
    ///
    /// # Errors
    ///
    /// As [`evaluate`](Self::evaluate), plus a schema error naming any
    /// missing or non-finite feature.
    pub fn evaluate_mapping(
        &self,
        fields: &FieldMap,
        processor: &FeatureProcessor,
        models: &ModelPair,
    ) -> Result<StrategyResult> {
        let record = AreaRecord::from_mapping(fields)?;
        self.evaluate(&record, processor, models)
    }
}

/// Evaluates one area with the default engine.
///
/// # Errors
///
/// See [`StrategyEngine::evaluate`].
pub fn evaluate(
    record: &AreaRecord,
    processor: &FeatureProcessor,
    models: &ModelPair,
) -> Result<StrategyResult> {
    StrategyEngine::new().evaluate(record, processor, models)
}

/// Evaluates one field-keyed mapping with the default engine.
///
/// # Errors
///
/// See [`StrategyEngine::evaluate_mapping`].
pub fn evaluate_mapping(
    fields: &FieldMap,
    processor: &FeatureProcessor,
    models: &ModelPair,
) -> Result<StrategyResult> {
    StrategyEngine::new().evaluate_mapping(fields, processor, models)
}
