//! Synthetic area data with a known causal structure.
//!
//! Demand is driven by population, infection rate and awareness; waste risk
//! by power stability, hub distance and (low) awareness. Everything else is
//! noise, so a trained model's importances can be checked against the
//! generating formulas.
//!
//! # Quick Start
//!
//! ```
//! use vaxflow::synthetic::generate;
//!
//! let df = generate(100, 42).expect("n_samples > 0");
//! assert_eq!(df.shape(), (100, 9));
//! assert_eq!(df, generate(100, 42).unwrap());
//! ```

use crate::data::{AreaRecord, DataFrame, Feature, RiskLevel, DEMAND_COLUMN, WASTE_RISK_COLUMN};
use crate::error::{Result, VaxError};
use crate::primitives::Vector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Upper clamp for generated demand.
pub const MAX_DEMAND: f64 = 10_000.0;

/// Inclusive-exclusive sampling range `[low, high)` for one feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRange {
    /// Lower bound
    pub low: f64,
    /// Upper bound
    pub high: f64,
}

impl FeatureRange {
    /// Creates a range.
    #[must_use]
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Returns true if `value` lies within `[low, high]`.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }
}

/// Generator parameters.
///
/// # Examples
///
/// ```
/// use vaxflow::data::Feature;
/// use vaxflow::synthetic::GeneratorConfig;
///
/// let config = GeneratorConfig::default()
///     .with_n_samples(500)
///     .with_range(Feature::Awareness, 20.0, 100.0);
/// assert_eq!(config.range(Feature::Awareness).low, 20.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Rows to generate
    pub n_samples: usize,
    /// RNG seed
    pub seed: u64,
    /// Per-feature sampling ranges; absent features use their nominal range
    pub ranges: BTreeMap<Feature, FeatureRange>,
    /// Standard deviation of the Gaussian noise added to demand
    pub demand_noise_std: f64,
    /// Standard deviation of the Gaussian noise added to the risk score
    pub risk_noise_std: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            n_samples: 500,
            seed: 42,
            ranges: Feature::ALL
                .iter()
                .map(|&f| {
                    let (low, high) = f.nominal_range();
                    (f, FeatureRange::new(low, high))
                })
                .collect(),
            demand_noise_std: 50.0,
            risk_noise_std: 10.0,
        }
    }
}

impl GeneratorConfig {
    /// Sets the row count.
    #[must_use]
    pub fn with_n_samples(mut self, n_samples: usize) -> Self {
        self.n_samples = n_samples;
        self
    }

    /// Sets the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Overrides one feature's sampling range.
    #[must_use]
    pub fn with_range(mut self, feature: Feature, low: f64, high: f64) -> Self {
        self.ranges.insert(feature, FeatureRange::new(low, high));
        self
    }

    /// Sets both noise standard deviations.
    #[must_use]
    pub fn with_noise(mut self, demand_noise_std: f64, risk_noise_std: f64) -> Self {
        self.demand_noise_std = demand_noise_std;
        self.risk_noise_std = risk_noise_std;
        self
    }

    /// Sampling range of `feature`.
    #[must_use]
    pub fn range(&self, feature: Feature) -> FeatureRange {
        self.ranges.get(&feature).copied().unwrap_or_else(|| {
            let (low, high) = feature.nominal_range();
            FeatureRange::new(low, high)
        })
    }

    /// Rejects empty or inverted ranges and negative noise.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` naming the offending setting.
    pub fn validate(&self) -> Result<()> {
        for feature in Feature::ALL {
            let r = self.range(feature);
            if !(r.low.is_finite() && r.high.is_finite() && r.low < r.high) {
                return Err(VaxError::InvalidHyperparameter {
                    param: format!("ranges.{}", feature.name()),
                    value: format!("[{}, {}]", r.low, r.high),
                    constraint: "finite with low < high".to_string(),
                });
            }
        }
        for (param, value) in [
            ("demand_noise_std", self.demand_noise_std),
            ("risk_noise_std", self.risk_noise_std),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(VaxError::InvalidHyperparameter {
                    param: param.to_string(),
                    value: value.to_string(),
                    constraint: ">= 0".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Noise-free demand for an area.
///
/// `Population/1000 * 0.3 + Infection_Rate * 50 + Awareness/100 * 100`
#[must_use]
pub fn expected_demand(area: &AreaRecord) -> f64 {
    area.population / 1000.0 * 0.3 + area.infection_rate * 50.0 + area.awareness / 100.0 * 100.0
}

/// Noise-free waste-risk score for an area.
///
/// `(1 - Power_Stability) * 50 + Distance_from_Hub/500 * 40 + (100 - Awareness)/100 * 30`
#[must_use]
pub fn expected_risk_score(area: &AreaRecord) -> f64 {
    (1.0 - area.power_stability) * 50.0
        + area.distance_from_hub / 500.0 * 40.0
        + (100.0 - area.awareness) / 100.0 * 30.0
}

/// Seeded generator of labeled and unlabeled area tables.
#[derive(Debug, Clone, Default)]
pub struct SyntheticGenerator {
    config: GeneratorConfig,
}

impl SyntheticGenerator {
    /// Creates a generator.
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Generator parameters.
    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Draws `n_samples` unlabeled areas, features uniform over their ranges.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientData` for `n_samples == 0` and
    /// `InvalidHyperparameter` for an invalid configuration.
    pub fn generate_areas(&self, n_samples: usize, seed: u64) -> Result<Vec<AreaRecord>> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.draw_areas(n_samples, &mut rng)
    }

    /// Draws a labeled table: the seven features, `Demand` and `Waste_Risk`.
    ///
    /// Demand noise is applied before clamping to `[0, MAX_DEMAND]`.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientData` for `n_samples == 0` and
    /// `InvalidHyperparameter` for an invalid configuration.
    pub fn generate(&self, n_samples: usize, seed: u64) -> Result<DataFrame> {
        info!(n_samples, seed, "generating synthetic area data");

        let mut rng = StdRng::seed_from_u64(seed);
        let areas = self.draw_areas(n_samples, &mut rng)?;

        let demand: Vec<f64> = areas
            .iter()
            .map(|a| {
                let noise = gaussian(&mut rng, self.config.demand_noise_std);
                (expected_demand(a) + noise).clamp(0.0, MAX_DEMAND)
            })
            .collect();
        let risk: Vec<f64> = areas
            .iter()
            .map(|a| {
                let score = expected_risk_score(a) + gaussian(&mut rng, self.config.risk_noise_std);
                RiskLevel::from_score(score).index() as f64
            })
            .collect();

        let mut df = DataFrame::from_records(&areas)?;
        df.add_column(DEMAND_COLUMN.to_string(), Vector::from_vec(demand))?;
        df.add_column(WASTE_RISK_COLUMN.to_string(), Vector::from_vec(risk))?;

        info!(
            n_samples,
            mean_demand = df.column(DEMAND_COLUMN)?.mean(),
            "synthetic data ready"
        );
        Ok(df)
    }

    fn draw_areas(&self, n_samples: usize, rng: &mut StdRng) -> Result<Vec<AreaRecord>> {
        if n_samples == 0 {
            return Err(VaxError::InsufficientData {
                context: "synthetic data generation".to_string(),
                required: 1,
                actual: 0,
            });
        }
        self.config.validate()?;

        // Column by column, so each feature consumes a contiguous RNG stream.
        let mut columns: [Vec<f64>; Feature::COUNT] =
            std::array::from_fn(|_| Vec::with_capacity(n_samples));
        for feature in Feature::ALL {
            let r = self.config.range(feature);
            columns[feature.index()].extend((0..n_samples).map(|_| rng.gen_range(r.low..r.high)));
        }

        Ok((0..n_samples)
            .map(|i| AreaRecord::from_array(std::array::from_fn(|j| columns[j][i])))
            .collect())
    }
}

/// Gaussian sample with mean 0 via the Box-Muller transform.
fn gaussian(rng: &mut impl Rng, std: f64) -> f64 {
    let u1: f64 = rng.gen_range(0.0001..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    std * z
}

/// Generates a labeled table with the default ranges and noise.
///
/// # Errors
///
/// Returns `InsufficientData` for `n_samples == 0`.
pub fn generate(n_samples: usize, seed: u64) -> Result<DataFrame> {
    SyntheticGenerator::default().generate(n_samples, seed)
}

/// Generates unlabeled areas with the default ranges.
///
/// # Errors
///
/// Returns `InsufficientData` for `n_samples == 0`.
pub fn generate_areas(n_samples: usize, seed: u64) -> Result<Vec<AreaRecord>> {
    SyntheticGenerator::default().generate_areas(n_samples, seed)
}
