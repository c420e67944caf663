//! Estimation engine
//!
//! Pure functions of the coefficient table and a token count. Nothing here
//! rounds; display precision is applied by the result types.

use crate::config::AppConfig;
use crate::models::{
    CoefficientTable, Equivalencies, EquivalencyFactors, ImpactSummary, ModelCoefficient, ModelResult,
};
use crate::utils::error::{helpers::not_found_error, AppResult};

/// Energy, latency and emission estimator
#[derive(Debug, Clone, PartialEq)]
pub struct Estimator {
    table: CoefficientTable,
    carbon_intensity: f64,
    factors: EquivalencyFactors,
}

impl Estimator {
    /// Create an estimator; inputs are expected to be validated already
    pub fn new(table: CoefficientTable, carbon_intensity: f64, factors: EquivalencyFactors) -> Self {
        Self {
            table,
            carbon_intensity,
            factors,
        }
    }

    /// Build from a validated catalog
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            config.coefficient_table()?,
            config.carbon_intensity,
            config.equivalencies,
        ))
    }

    pub fn table(&self) -> &CoefficientTable {
        &self.table
    }

    pub fn carbon_intensity(&self) -> f64 {
        self.carbon_intensity
    }

    pub fn factors(&self) -> &EquivalencyFactors {
        &self.factors
    }

    /// Estimate one model for a token count
    pub fn estimate(&self, model_id: &str, token_count: usize) -> AppResult<ModelResult> {
        let coefficient = self
            .table
            .get(model_id)
            .ok_or_else(|| not_found_error(format!("No coefficients for model '{}'", model_id)))?;

        Ok(self.result_for(coefficient, token_count))
    }

    /// Estimate each of `model_ids`, in the given order
    ///
    /// Fails as a whole if any model is missing from the table, so callers never
    /// see a partial set.
    pub fn estimate_models(&self, model_ids: &[String], token_count: usize) -> AppResult<Vec<ModelResult>> {
        model_ids
            .iter()
            .map(|id| self.estimate(id, token_count))
            .collect()
    }

    /// Estimate every model of the table, in table order
    pub fn estimate_all(&self, token_count: usize) -> Vec<ModelResult> {
        self.table
            .iter()
            .map(|coefficient| self.result_for(coefficient, token_count))
            .collect()
    }

    fn result_for(&self, coefficient: &ModelCoefficient, token_count: usize) -> ModelResult {
        let tokens = token_count as f64;
        let total_energy = tokens * coefficient.energy_per_kilo_token / 1000.0;

        ModelResult {
            name: coefficient.model_id.clone(),
            token_count,
            energy_per_token: coefficient.energy_per_kilo_token,
            total_energy,
            estimated_time: (coefficient.base_latency / 100.0) * tokens,
            co2_emissions: total_energy * self.carbon_intensity,
        }
    }

    /// Convert grams of CO2e into everyday units
    pub fn equivalency(&self, co2: f64) -> Equivalencies {
        Equivalencies {
            car_miles: co2 / self.factors.car_miles_grams_per_mile,
            light_bulb_hours: co2 / self.factors.light_bulb_grams_per_hour,
            smartphone_charges: co2 / self.factors.smartphone_grams_per_charge,
            tree_seconds: co2 / self.factors.tree_grams_per_second,
        }
    }

    /// Aggregate impact of a result set
    pub fn summarize(&self, results: &[ModelResult]) -> ImpactSummary {
        // f64's Sum starts from -0.0; an empty set must render as plain zeros
        let total_co2 = results.iter().fold(0.0, |acc, r| acc + r.co2_emissions);
        let equivalencies = self.equivalency(total_co2);

        ImpactSummary {
            total_co2,
            display: equivalencies.formatted(),
            equivalencies,
        }
    }
}
