//! The seven-feature Area Record and the risk label.

use crate::error::{Result, VaxError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Field-keyed mapping form of a record (`"Population" -> 150000.0`, ...).
pub type FieldMap = BTreeMap<String, f64>;

/// Column holding the continuous demand target.
pub const DEMAND_COLUMN: &str = "Demand";

/// Column holding the ordinal waste-risk target (0, 1, 2).
pub const WASTE_RISK_COLUMN: &str = "Waste_Risk";

/// One of the seven declared area features.
///
/// The declaration order is the canonical feature order: scalers, models and
/// importance tables are all aligned to [`Feature::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Feature {
    /// Area population (count)
    #[serde(rename = "Population")]
    Population,
    /// Age distribution index, higher = older population
    #[serde(rename = "Age_Dist")]
    AgeDist,
    /// Doses administered in the past seven days
    #[serde(rename = "Past_7_Days")]
    Past7Days,
    /// Infection rate (percent)
    #[serde(rename = "Infection_Rate")]
    InfectionRate,
    /// Vaccination awareness score
    #[serde(rename = "Awareness")]
    Awareness,
    /// Grid power stability index
    #[serde(rename = "Power_Stability")]
    PowerStability,
    /// Distance from the distribution hub (km)
    #[serde(rename = "Distance_from_Hub")]
    DistanceFromHub,
}

impl Feature {
    /// All features in canonical order.
    pub const ALL: [Feature; 7] = [
        Feature::Population,
        Feature::AgeDist,
        Feature::Past7Days,
        Feature::InfectionRate,
        Feature::Awareness,
        Feature::PowerStability,
        Feature::DistanceFromHub,
    ];

    /// Number of declared features.
    pub const COUNT: usize = 7;

    /// Column name used in tables and field-keyed mappings.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Feature::Population => "Population",
            Feature::AgeDist => "Age_Dist",
            Feature::Past7Days => "Past_7_Days",
            Feature::InfectionRate => "Infection_Rate",
            Feature::Awareness => "Awareness",
            Feature::PowerStability => "Power_Stability",
            Feature::DistanceFromHub => "Distance_from_Hub",
        }
    }

    /// Position in the canonical order.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Looks a feature up by its column name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }

    /// Declared value range `(low, high)` of the feature.
    #[must_use]
    pub fn nominal_range(self) -> (f64, f64) {
        match self {
            Feature::Population => (1_000.0, 500_000.0),
            Feature::AgeDist => (0.0, 1.0),
            Feature::Past7Days => (50.0, 5_000.0),
            Feature::InfectionRate => (0.1, 10.0),
            Feature::Awareness => (0.0, 100.0),
            Feature::PowerStability => (0.0, 1.0),
            Feature::DistanceFromHub => (5.0, 500.0),
        }
    }

    /// Names of all features in canonical order.
    #[must_use]
    pub fn names() -> [&'static str; 7] {
        Self::ALL.map(Feature::name)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Demographics of one geographic unit of vaccine distribution.
///
/// # Examples
///
/// ```
/// use vaxflow::data::{AreaRecord, Feature};
///
/// let area = AreaRecord {
///     population: 150_000.0,
///     age_dist: 0.35,
///     past_7_days: 2_500.0,
///     infection_rate: 3.5,
///     awareness: 75.0,
///     power_stability: 0.85,
///     distance_from_hub: 45.0,
/// };
/// assert_eq!(area.get(Feature::Awareness), 75.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaRecord {
    /// Area population (count)
    #[serde(rename = "Population")]
    pub population: f64,
    /// Age distribution index
    #[serde(rename = "Age_Dist")]
    pub age_dist: f64,
    /// Doses administered in the past seven days
    #[serde(rename = "Past_7_Days")]
    pub past_7_days: f64,
    /// Infection rate (percent)
    #[serde(rename = "Infection_Rate")]
    pub infection_rate: f64,
    /// Vaccination awareness score
    #[serde(rename = "Awareness")]
    pub awareness: f64,
    /// Grid power stability index
    #[serde(rename = "Power_Stability")]
    pub power_stability: f64,
    /// Distance from the distribution hub (km)
    #[serde(rename = "Distance_from_Hub")]
    pub distance_from_hub: f64,
}

impl AreaRecord {
    /// Builds a record from values in canonical feature order.
    #[must_use]
    pub fn from_array(values: [f64; 7]) -> Self {
        Self {
            population: values[0],
            age_dist: values[1],
            past_7_days: values[2],
            infection_rate: values[3],
            awareness: values[4],
            power_stability: values[5],
            distance_from_hub: values[6],
        }
    }

    /// Values in canonical feature order.
    #[must_use]
    pub fn to_array(&self) -> [f64; 7] {
        Feature::ALL.map(|f| self.get(f))
    }

    /// Value of one feature.
    #[must_use]
    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Population => self.population,
            Feature::AgeDist => self.age_dist,
            Feature::Past7Days => self.past_7_days,
            Feature::InfectionRate => self.infection_rate,
            Feature::Awareness => self.awareness,
            Feature::PowerStability => self.power_stability,
            Feature::DistanceFromHub => self.distance_from_hub,
        }
    }

    /// Sets one feature.
    pub fn set(&mut self, feature: Feature, value: f64) {
        match feature {
            Feature::Population => self.population = value,
            Feature::AgeDist => self.age_dist = value,
            Feature::Past7Days => self.past_7_days = value,
            Feature::InfectionRate => self.infection_rate = value,
            Feature::Awareness => self.awareness = value,
            Feature::PowerStability => self.power_stability = value,
            Feature::DistanceFromHub => self.distance_from_hub = value,
        }
    }

    /// Checks that every feature holds a finite number.
    ///
    /// # Errors
    ///
    /// Returns a schema error naming the first non-finite feature.
    pub fn validate(&self) -> Result<()> {
        for feature in Feature::ALL {
            let value = self.get(feature);
            if !value.is_finite() {
                return Err(VaxError::non_numeric(feature.name(), value));
            }
        }
        Ok(())
    }

    /// Builds a validated record from a field-keyed mapping.
    ///
    /// Extra keys are ignored; order of keys does not matter.
    ///
    /// # Errors
    ///
    /// Returns a schema error if a declared feature is absent or non-finite.
    pub fn from_mapping(map: &FieldMap) -> Result<Self> {
        let mut values = [0.0; 7];
        for feature in Feature::ALL {
            let value = *map
                .get(feature.name())
                .ok_or_else(|| VaxError::missing_feature(feature.name()))?;
            if !value.is_finite() {
                return Err(VaxError::non_numeric(feature.name(), value));
            }
            values[feature.index()] = value;
        }
        Ok(Self::from_array(values))
    }

    /// Field-keyed mapping form of the record.
    #[must_use]
    pub fn to_mapping(&self) -> FieldMap {
        Feature::ALL
            .iter()
            .map(|&f| (f.name().to_string(), self.get(f)))
            .collect()
    }
}

/// Ordinal waste-risk category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Class 0
    Low,
    /// Class 1
    Medium,
    /// Class 2
    High,
}

impl RiskLevel {
    /// All levels in class-index order.
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    /// Number of risk classes.
    pub const N_CLASSES: usize = 3;

    /// Maps a class index to its level.
    #[must_use]
    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    /// Class index of this level.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }

    /// Buckets a raw risk score: `<= 40` Low, `<= 70` Medium, else High.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score <= 40.0 {
            RiskLevel::Low
        } else if score <= 70.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AreaRecord {
        AreaRecord::from_array([150_000.0, 0.35, 2_500.0, 3.5, 75.0, 0.85, 45.0])
    }

    #[test]
    fn test_canonical_order() {
        assert_eq!(
            Feature::names(),
            [
                "Population",
                "Age_Dist",
                "Past_7_Days",
                "Infection_Rate",
                "Awareness",
                "Power_Stability",
                "Distance_from_Hub"
            ]
        );
        for (i, f) in Feature::ALL.iter().enumerate() {
            assert_eq!(f.index(), i);
            assert_eq!(Feature::from_name(f.name()), Some(*f));
        }
    }

    #[test]
    fn test_array_round_trip() {
        let r = sample();
        assert_eq!(AreaRecord::from_array(r.to_array()), r);
    }

    #[test]
    fn test_from_mapping_missing_feature() {
        let mut map = sample().to_mapping();
        map.remove("Power_Stability");
        let err = AreaRecord::from_mapping(&map).expect_err("missing feature");
        assert!(err.to_string().contains("Power_Stability"));
    }

    #[test]
    fn test_from_mapping_non_finite() {
        let mut map = sample().to_mapping();
        map.insert("Awareness".to_string(), f64::NAN);
        let err = AreaRecord::from_mapping(&map).expect_err("NaN feature");
        assert!(err.is_schema());
    }

    #[test]
    fn test_from_mapping_ignores_extra_keys() {
        let mut map = sample().to_mapping();
        map.insert("Area_Name".to_string(), 1.0);
        assert_eq!(AreaRecord::from_mapping(&map).expect("valid"), sample());
    }

    #[test]
    fn test_serde_uses_column_names() {
        let json = serde_json::to_value(sample()).expect("serializable");
        assert_eq!(json["Distance_from_Hub"], 45.0);
        let back: AreaRecord = serde_json::from_value(json).expect("deserializable");
        assert_eq!(back, sample());
    }

    #[test]
    fn test_risk_buckets() {
        assert_eq!(RiskLevel::from_score(-5.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(40.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(40.01), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(70.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(70.5), RiskLevel::High);
    }

    #[test]
    fn test_risk_index_mapping() {
        assert_eq!(RiskLevel::from_index(0), Some(RiskLevel::Low));
        assert_eq!(RiskLevel::from_index(2), Some(RiskLevel::High));
        assert_eq!(RiskLevel::from_index(3), None);
        assert_eq!(RiskLevel::High.to_string(), "High");
    }
}
