//! Static estimation coefficients
//!
//! Per-model energy and latency coefficients, carbon intensity and the
//! environmental equivalency factors. All values are literature-derived
//! benchmark figures, not measurements.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Average data center carbon intensity (gCO2e per Wh)
pub const DEFAULT_CARBON_INTENSITY: f64 = 0.475;

/// Energy and latency coefficients of one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCoefficient {
    /// Model identifier, unique within a table
    #[serde(rename = "modelId")]
    pub model_id: String,
    /// Energy in Wh per 1000 tokens
    #[serde(rename = "energyPerKiloToken")]
    pub energy_per_kilo_token: f64,
    /// Base computation time in seconds
    #[serde(rename = "baseLatency")]
    pub base_latency: f64,
}

impl ModelCoefficient {
    pub fn new(model_id: impl Into<String>, energy_per_kilo_token: f64, base_latency: f64) -> Self {
        Self {
            model_id: model_id.into(),
            energy_per_kilo_token,
            base_latency,
        }
    }
}

/// Conversion factors from grams of CO2e to everyday units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquivalencyFactors {
    /// gCO2e per mile driven
    #[serde(rename = "carMilesGramsPerMile")]
    pub car_miles_grams_per_mile: f64,
    /// gCO2e per hour of a 10W LED bulb
    #[serde(rename = "lightBulbGramsPerHour")]
    pub light_bulb_grams_per_hour: f64,
    /// gCO2e per full smartphone charge
    #[serde(rename = "smartphoneGramsPerCharge")]
    pub smartphone_grams_per_charge: f64,
    /// gCO2e absorbed per second by a mature tree
    #[serde(rename = "treeGramsPerSecond")]
    pub tree_grams_per_second: f64,
}

impl Default for EquivalencyFactors {
    fn default() -> Self {
        Self {
            car_miles_grams_per_mile: 404.0,
            light_bulb_grams_per_hour: 11.0,
            smartphone_grams_per_charge: 2.3,
            tree_grams_per_second: 0.0138,
        }
    }
}

impl EquivalencyFactors {
    /// Every factor is used as a divisor, so all of them must be strictly positive
    pub fn validate(&self) -> Result<()> {
        let factors = [
            ("carMilesGramsPerMile", self.car_miles_grams_per_mile),
            ("lightBulbGramsPerHour", self.light_bulb_grams_per_hour),
            ("smartphoneGramsPerCharge", self.smartphone_grams_per_charge),
            ("treeGramsPerSecond", self.tree_grams_per_second),
        ];

        for (name, value) in factors {
            if !(value.is_finite() && value > 0.0) {
                anyhow::bail!("Equivalency factor '{}' must be a positive number, got {}", name, value);
            }
        }

        Ok(())
    }
}

/// Immutable coefficient table keyed by model identifier
///
/// Keeps insertion order so that result sets follow the configured model order.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientTable {
    entries: Vec<ModelCoefficient>,
}

impl CoefficientTable {
    /// Build a table, rejecting duplicate ids and negative or non-finite coefficients
    pub fn new(entries: Vec<ModelCoefficient>) -> Result<Self> {
        let mut seen = HashSet::new();

        for entry in &entries {
            if entry.model_id.trim().is_empty() {
                anyhow::bail!("Model identifier cannot be empty");
            }
            if !seen.insert(entry.model_id.as_str()) {
                anyhow::bail!("Duplicate model identifier: {}", entry.model_id);
            }
            if !(entry.energy_per_kilo_token.is_finite() && entry.energy_per_kilo_token >= 0.0) {
                anyhow::bail!(
                    "energyPerKiloToken for '{}' must be non-negative, got {}",
                    entry.model_id,
                    entry.energy_per_kilo_token
                );
            }
            if !(entry.base_latency.is_finite() && entry.base_latency >= 0.0) {
                anyhow::bail!(
                    "baseLatency for '{}' must be non-negative, got {}",
                    entry.model_id,
                    entry.base_latency
                );
            }
        }

        Ok(Self { entries })
    }

    pub fn get(&self, model_id: &str) -> Option<&ModelCoefficient> {
        self.entries.iter().find(|entry| entry.model_id == model_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelCoefficient> {
        self.entries.iter()
    }

    pub fn model_ids(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.model_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
