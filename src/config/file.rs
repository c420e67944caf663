//! File-based catalog loading
//!
//! Loads the model catalog (coefficients and upstream endpoint definitions)
//! from a JSON file, falling back to the built-in catalog.

use crate::models::{CoefficientTable, EquivalencyFactors, ModelCoefficient, DEFAULT_CARBON_INTENSITY};
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// Routes served by the application itself; model endpoints may not shadow them
pub const RESERVED_ROUTES: [&str; 4] = ["/api/tokenize", "/api/estimate", "/api/models", "/api/session"];

/// Provider types understood by the gateway
pub const PROVIDER_TYPES: [&str; 2] = ["replicate", "openai"];

/// Catalog shipped with the binary
pub static BUILTIN_CATALOG: Lazy<AppConfig> = Lazy::new(AppConfig::builtin);

/// Application catalog loaded from JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configured models, in display order
    pub models: Vec<ModelEntry>,

    /// gCO2e per Wh
    #[serde(rename = "carbonIntensity", default = "default_carbon_intensity")]
    pub carbon_intensity: f64,

    /// Environmental equivalency factors
    #[serde(default)]
    pub equivalencies: EquivalencyFactors,
}

fn default_carbon_intensity() -> f64 {
    DEFAULT_CARBON_INTENSITY
}

/// One model of the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Model identifier shown to users
    pub id: String,

    /// Wh per 1000 tokens
    #[serde(rename = "energyPerKiloToken")]
    pub energy_per_kilo_token: f64,

    /// Seconds
    #[serde(rename = "baseLatency")]
    pub base_latency: f64,

    /// Tokenizer this model would ideally be counted with (informational)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokenizer: Option<String>,

    /// Upstream endpoint definition
    pub endpoint: EndpointConfig,
}

/// Upstream endpoint definition of a model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Route served by this application, e.g. "/api/llama"
    pub route: String,

    /// Provider type ("replicate" or "openai")
    pub provider: String,

    /// Upstream model name, e.g. "meta/llama-2-7b-chat"
    pub model: String,

    /// Fixed generation parameters merged into every request
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,

    /// System prompt for chat-style providers
    #[serde(rename = "systemPrompt", skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl AppConfig {
    /// Built-in catalog of benchmark coefficients
    pub fn builtin() -> Self {
        let entry = |id: &str, energy: f64, latency: f64, tokenizer: &str, route: &str, provider: &str, model: &str, parameters: Value| {
            ModelEntry {
                id: id.to_string(),
                energy_per_kilo_token: energy,
                base_latency: latency,
                tokenizer: Some(tokenizer.to_string()),
                endpoint: EndpointConfig {
                    route: route.to_string(),
                    provider: provider.to_string(),
                    model: model.to_string(),
                    parameters: parameters.as_object().cloned().unwrap_or_default(),
                    system_prompt: None,
                },
            }
        };

        let mut sundai = entry(
            "Sundai R1", 40.22, 17.19,
            "deepseek-ai/deepseek-coder-6.7b-base",
            "/api/deepseek-openai", "openai", "deepseek-ai/DeepSeek-R1",
            json!({ "top_p": 0.95, "temperature": 0.7 }),
        );
        sundai.endpoint.system_prompt = Some("You are a helpful assistant.".to_string());

        Self {
            models: vec![
                entry(
                    "Llama 3", 37.24, 1.96,
                    "Xenova/llama-2-7b",
                    "/api/llama", "replicate", "meta/llama-2-70b-chat",
                    json!({ "top_p": 1, "temperature": 0.5, "max_new_tokens": 500, "min_new_tokens": -1 }),
                ),
                entry(
                    "DeepSeek", 2.72, 5.43,
                    "deepseek-ai/deepseek-coder-6.7b-base",
                    "/api/deepseek", "replicate", "deepseek-ai/deepseek-r1",
                    json!({}),
                ),
                entry(
                    "Llama 2", 15.33, 1.49,
                    "Xenova/llama-2-7b",
                    "/api/llama2", "replicate", "meta/llama-2-7b-chat",
                    json!({ "top_p": 1, "temperature": 0.75, "max_new_tokens": 800 }),
                ),
                entry(
                    "Mistral", 6.18, 4.55,
                    "mistralai/Mistral-7B-v0.1",
                    "/api/mistral", "replicate", "mistralai/mistral-7b-v0.1",
                    json!({ "max_new_tokens": 150, "temperature": 0.7 }),
                ),
                sundai,
            ],
            carbon_intensity: DEFAULT_CARBON_INTENSITY,
            equivalencies: EquivalencyFactors::default(),
        }
    }

    /// Load catalog from JSON file
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading catalog from: {:?}", path);

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {:?}", path))?;

        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| "Failed to parse catalog JSON")?;

        config.validate()?;

        debug!("Loaded {} models", config.models.len());
        Ok(config)
    }

    /// Load catalog from default locations
    /// Searches in order:
    /// 1. ~/.config/promptprint/promptprint.json
    /// 2. ./promptprint.json
    ///
    /// Falls back to the built-in catalog when neither exists.
    pub fn load_default() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let config_path = home.join(".config").join("promptprint").join("promptprint.json");
            if config_path.exists() {
                return Self::load(&config_path);
            }
        }

        let local_path = Path::new("promptprint.json");
        if local_path.exists() {
            return Self::load(local_path);
        }

        info!("No catalog file found, using built-in catalog");
        Ok(BUILTIN_CATALOG.clone())
    }

    /// Validate catalog
    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            anyhow::bail!("At least one model must be configured");
        }

        if !(self.carbon_intensity.is_finite() && self.carbon_intensity >= 0.0) {
            anyhow::bail!("carbonIntensity must be non-negative, got {}", self.carbon_intensity);
        }

        self.equivalencies.validate()?;

        // Duplicate ids and coefficient ranges
        self.coefficient_table()?;

        let mut routes = HashSet::new();
        for model in &self.models {
            let endpoint = &model.endpoint;

            if !PROVIDER_TYPES.contains(&endpoint.provider.as_str()) {
                anyhow::bail!("Invalid provider type '{}' for model '{}'", endpoint.provider, model.id);
            }

            if endpoint.model.trim().is_empty() {
                anyhow::bail!("Model '{}' must name an upstream model", model.id);
            }

            if endpoint.provider == "replicate" && !endpoint.model.contains('/') {
                anyhow::bail!(
                    "Replicate model for '{}' must be 'owner/name', got '{}'",
                    model.id,
                    endpoint.model
                );
            }

            validate_route(&endpoint.route)
                .with_context(|| format!("Invalid route for model '{}'", model.id))?;

            if !routes.insert(endpoint.route.as_str()) {
                anyhow::bail!("Duplicate route: {}", endpoint.route);
            }
        }

        Ok(())
    }

    /// Coefficient table derived from the catalog
    pub fn coefficient_table(&self) -> Result<CoefficientTable> {
        CoefficientTable::new(
            self.models
                .iter()
                .map(|m| ModelCoefficient::new(m.id.clone(), m.energy_per_kilo_token, m.base_latency))
                .collect(),
        )
    }

    /// Find a model by identifier
    pub fn model(&self, id: &str) -> Option<&ModelEntry> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Find the model served on a route
    pub fn model_by_route(&self, route: &str) -> Option<&ModelEntry> {
        self.models.iter().find(|m| m.endpoint.route == route)
    }

    /// Configured model identifiers in catalog order
    pub fn model_ids(&self) -> Vec<String> {
        self.models.iter().map(|m| m.id.clone()).collect()
    }
}

/// Routes are a single segment under /api/ and must not shadow application routes
fn validate_route(route: &str) -> Result<()> {
    let segment = route
        .strip_prefix("/api/")
        .with_context(|| format!("Route must start with '/api/': {}", route))?;

    if segment.is_empty()
        || !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        anyhow::bail!("Route must be a single '/api/<name>' segment: {}", route);
    }

    if RESERVED_ROUTES.contains(&route) {
        anyhow::bail!("Route is reserved: {}", route);
    }

    Ok(())
}
