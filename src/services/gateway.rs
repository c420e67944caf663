//! Model gateway
//!
//! Routes a model identifier to its provider and endpoint definition, and fans
//! a prompt out to every model without letting one failure affect another.

use crate::config::settings::ProviderCredentials;
use crate::config::{AppConfig, EndpointConfig};
use crate::providers::{OpenAIProvider, Provider, ReplicateProvider};
use crate::utils::error::{helpers::gateway_error, helpers::not_found_error, AppResult};
use crate::utils::logging::prompt_preview;
use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outbound side of a submission
///
/// The caller only learns whether the call completed; output is discarded.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Reachable models, in catalog order
    fn model_ids(&self) -> Vec<String>;

    /// Send the prompt to one model
    async fn invoke(&self, model_id: &str, prompt: &str) -> AppResult<()>;
}

/// Gateway over the configured upstream providers
pub struct ModelGateway {
    /// Model catalog
    config: AppConfig,
    /// Provider instances by type
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ModelGateway {
    /// Create a gateway with one provider instance per provider type in use
    pub fn new(config: AppConfig, credentials: &ProviderCredentials) -> Result<Self> {
        let mut providers: HashMap<String, Arc<dyn Provider>> = HashMap::new();

        for model in &config.models {
            let provider_type = &model.endpoint.provider;

            if !providers.contains_key(provider_type) {
                let provider: Arc<dyn Provider> = match provider_type.as_str() {
                    "replicate" => Arc::new(ReplicateProvider::new(credentials)?),
                    "openai" => Arc::new(OpenAIProvider::new(credentials)?),
                    other => anyhow::bail!("Unknown provider type: {}", other),
                };

                providers.insert(provider_type.clone(), provider);
            }
        }

        info!("Gateway initialized with {} provider types", providers.len());

        Ok(Self { config, providers })
    }

    /// Create a gateway with explicit provider instances
    pub fn with_providers(config: AppConfig, providers: HashMap<String, Arc<dyn Provider>>) -> Self {
        Self { config, providers }
    }

    /// Resolve a model identifier to its provider and endpoint definition
    pub fn route(&self, model_id: &str) -> Option<(Arc<dyn Provider>, &EndpointConfig)> {
        let model = self.config.model(model_id)?;
        let provider = self.providers.get(&model.endpoint.provider)?;

        debug!("Routed {} to provider type: {}", model_id, model.endpoint.provider);

        Some((provider.clone(), &model.endpoint))
    }

    /// Send the prompt to one model and return its output
    pub async fn generate(&self, model_id: &str, prompt: &str) -> AppResult<String> {
        let (provider, endpoint) = self
            .route(model_id)
            .ok_or_else(|| not_found_error(format!("Model not found: {}", model_id)))?;

        debug!(
            "Calling {} via {} with prompt '{}'",
            model_id,
            provider.name(),
            prompt_preview(prompt)
        );

        provider
            .generate(prompt, endpoint)
            .await
            .map_err(|e| gateway_error(model_id, format!("{:#}", e)))
    }

    /// Get the underlying catalog
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

#[async_trait]
impl Gateway for ModelGateway {
    fn model_ids(&self) -> Vec<String> {
        self.config.model_ids()
    }

    async fn invoke(&self, model_id: &str, prompt: &str) -> AppResult<()> {
        self.generate(model_id, prompt).await.map(|_| ())
    }
}

/// Invoke every model concurrently and wait for all of them to settle
///
/// Never short-circuits. Failures are logged and returned as the list of
/// failed model identifiers, in the order of `model_ids`.
pub async fn invoke_all(gateway: &dyn Gateway, model_ids: &[String], prompt: &str) -> Vec<String> {
    let calls = model_ids.iter().map(|model_id| async move {
        let outcome = gateway.invoke(model_id, prompt).await;
        (model_id, outcome)
    });

    join_all(calls)
        .await
        .into_iter()
        .filter_map(|(model_id, outcome)| match outcome {
            Ok(()) => {
                debug!("Call to {} completed", model_id);
                None
            }
            Err(e) => {
                warn!("Call to {} failed, continuing without it: {}", model_id, e);
                Some(model_id.clone())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    struct EchoProvider;

    #[async_trait]
    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, prompt: &str, endpoint: &EndpointConfig) -> Result<String> {
            if endpoint.model.contains("broken") {
                anyhow::bail!("upstream returned 500");
            }
            Ok(format!("{}: {}", endpoint.model, prompt))
        }
    }

    fn create_test_gateway() -> ModelGateway {
        let mut config = AppConfig::builtin();
        config.models[1].endpoint.model = "owner/broken".to_string();

        let echo: Arc<dyn Provider> = Arc::new(EchoProvider);
        let mut providers = HashMap::new();
        providers.insert("replicate".to_string(), echo.clone());
        providers.insert("openai".to_string(), echo);

        ModelGateway::with_providers(config, providers)
    }

    #[test]
    fn test_gateway_creation() {
        let gateway = ModelGateway::new(AppConfig::builtin(), &Settings::default().providers);
        assert!(gateway.is_ok());
    }

    #[test]
    fn test_route() {
        let gateway = create_test_gateway();

        let (provider, endpoint) = gateway.route("Mistral").unwrap();
        assert_eq!(provider.name(), "echo");
        assert_eq!(endpoint.route, "/api/mistral");

        assert!(gateway.route("GPT-9").is_none());
    }

    #[tokio::test]
    async fn test_generate() {
        let gateway = create_test_gateway();
        let output = gateway.generate("Llama 2", "hi").await.unwrap();
        assert_eq!(output, "meta/llama-2-7b-chat: hi");
    }

    #[tokio::test]
    async fn test_invoke_all_collects_failures() {
        let gateway = create_test_gateway();
        let mut ids = gateway.model_ids();
        ids.push("GPT-9".to_string());

        let failed = invoke_all(&gateway, &ids, "hello").await;
        assert_eq!(failed, vec!["DeepSeek".to_string(), "GPT-9".to_string()]);
    }
}
