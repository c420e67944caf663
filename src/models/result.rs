//! Estimation results
//!
//! Values produced by the estimation engine. Everything here is created once
//! and never mutated; a new submission replaces the whole set.

use serde::{Deserialize, Serialize};

/// Per-model estimate for one submitted prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelResult {
    /// Model identifier
    pub name: String,
    /// Prompt token count, shared by every result of a submission
    pub token_count: usize,
    /// Raw coefficient in Wh per 1000 tokens
    pub energy_per_token: f64,
    /// Wh
    pub total_energy: f64,
    /// Seconds, from the linear latency model
    pub estimated_time: f64,
    /// gCO2e
    pub co2_emissions: f64,
}

/// Emissions expressed in everyday units, full precision
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Equivalencies {
    pub car_miles: f64,
    pub light_bulb_hours: f64,
    pub smartphone_charges: f64,
    pub tree_seconds: f64,
}

/// Equivalencies rounded for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedEquivalencies {
    pub car_miles: String,
    pub light_bulb_hours: String,
    pub smartphone_charges: String,
    pub tree_seconds: String,
}

impl Equivalencies {
    pub fn formatted(&self) -> FormattedEquivalencies {
        FormattedEquivalencies {
            car_miles: format!("{:.4}", self.car_miles),
            light_bulb_hours: format!("{:.2}", self.light_bulb_hours),
            smartphone_charges: format!("{:.2}", self.smartphone_charges),
            tree_seconds: format!("{:.0}", self.tree_seconds),
        }
    }
}

/// Aggregate impact of a whole result set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactSummary {
    /// Sum of co2Emissions over the result set
    pub total_co2: f64,
    pub equivalencies: Equivalencies,
    pub display: FormattedEquivalencies,
}

/// Complete outcome of one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReport {
    /// Monotonic submission number
    pub submission: u64,
    pub token_count: usize,
    /// One entry per configured model, in catalog order
    pub results: Vec<ModelResult>,
    /// Models whose gateway call failed; their estimates are still present
    pub failed_models: Vec<String>,
    pub impact: ImpactSummary,
    /// Display strings per result, same order as `results`
    pub cards: Vec<ResultCard>,
}

/// Display strings for one result card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultCard {
    pub name: String,
    /// Wh per token
    pub energy_per_token: String,
    pub total_energy: String,
    pub co2_emissions: String,
    pub estimated_time: String,
    pub token_count: String,
}

impl ModelResult {
    pub fn card(&self) -> ResultCard {
        ResultCard {
            name: self.name.clone(),
            energy_per_token: format!("{:.6} Wh", self.energy_per_token / 1000.0),
            total_energy: format!("{:.4} Wh", self.total_energy),
            co2_emissions: format!("{:.4} gCO₂e", self.co2_emissions),
            estimated_time: format!("{:.2}s", self.estimated_time),
            token_count: self.token_count.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalency_display_precision() {
        let equivalencies = Equivalencies {
            car_miles: 0.000175138,
            light_bulb_hours: 0.0064323,
            smartphone_charges: 0.0307635,
            tree_seconds: 5.1272,
        };

        let display = equivalencies.formatted();
        assert_eq!(display.car_miles, "0.0002");
        assert_eq!(display.light_bulb_hours, "0.01");
        assert_eq!(display.smartphone_charges, "0.03");
        assert_eq!(display.tree_seconds, "5");
    }

    #[test]
    fn test_result_card() {
        let result = ModelResult {
            name: "Llama 3".to_string(),
            token_count: 4,
            energy_per_token: 37.24,
            total_energy: 0.14896,
            estimated_time: 0.0784,
            co2_emissions: 0.070756,
        };

        let card = result.card();
        assert_eq!(card.energy_per_token, "0.037240 Wh");
        assert_eq!(card.total_energy, "0.1490 Wh");
        assert_eq!(card.co2_emissions, "0.0708 gCO₂e");
        assert_eq!(card.estimated_time, "0.08s");
        assert_eq!(card.token_count, "4");
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = ModelResult {
            name: "Mistral".to_string(),
            token_count: 1,
            energy_per_token: 6.18,
            total_energy: 0.00618,
            estimated_time: 0.0455,
            co2_emissions: 0.0029355,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["tokenCount"], 1);
        assert_eq!(json["energyPerToken"], 6.18);
        assert!(json.get("co2Emissions").is_some());
    }
}
