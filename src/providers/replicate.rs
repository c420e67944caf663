//! Replicate provider implementation
//!
//! Creates a prediction for an official model and follows it until it reaches
//! a terminal status.

use super::Provider;
use crate::config::settings::ProviderCredentials;
use crate::config::EndpointConfig;
use crate::utils::error::AppError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};

/// Prediction resource as returned by the Replicate API
#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    id: Option<String>,
    status: String,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    error: Value,
    #[serde(default)]
    urls: Option<PredictionUrls>,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    #[serde(default)]
    get: Option<String>,
}

impl Prediction {
    /// Language models stream their output as an array of string chunks
    fn output_text(&self) -> String {
        match &self.output {
            Value::Null => String::new(),
            Value::String(text) => text.clone(),
            Value::Array(chunks) => chunks
                .iter()
                .map(|chunk| match chunk {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            other => other.to_string(),
        }
    }
}

/// Replicate provider
pub struct ReplicateProvider {
    client: Client,
    base_url: String,
    api_token: Option<String>,
    poll_interval: Duration,
}

impl ReplicateProvider {
    /// Create a provider from the configured credentials
    pub fn new(credentials: &ProviderCredentials) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("promptprint/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: credentials.replicate_base_url.clone(),
            api_token: credentials.replicate_api_token.clone(),
            poll_interval: Duration::from_millis(credentials.replicate_poll_interval_ms),
        })
    }

    /// Build the prediction URL for an "owner/name" model
    fn build_url(&self, model: &str) -> String {
        format!("{}/models/{}/predictions", self.base_url.trim_end_matches('/'), model)
    }

    /// Build the request body: the prompt plus the fixed parameters as `input`
    fn build_body(prompt: &str, endpoint: &EndpointConfig) -> Value {
        let mut input = endpoint.parameters.clone();
        input.insert("prompt".to_string(), json!(prompt));
        json!({ "input": input })
    }

    async fn parse_prediction(response: Response) -> Result<Prediction> {
        let status = response.status();

        if status.is_success() {
            response
                .json::<Prediction>()
                .await
                .context("Failed to parse Replicate prediction")
        } else {
            let error_text = response.text().await.unwrap_or_default();
            error!("Replicate API request failed: {} - {}", status, error_text);
            anyhow::bail!("Replicate API request failed: {} - {}", status, error_text);
        }
    }
}

#[async_trait]
impl Provider for ReplicateProvider {
    fn name(&self) -> &str {
        "replicate"
    }

    async fn generate(&self, prompt: &str, endpoint: &EndpointConfig) -> Result<String> {
        let token = self
            .api_token
            .as_deref()
            .ok_or_else(|| AppError::MissingCredential("REPLICATE_API_TOKEN".to_string()))?;

        debug!("Creating Replicate prediction for {}", endpoint.model);

        let response = self
            .client
            .post(self.build_url(&endpoint.model))
            .bearer_auth(token)
            .header("Prefer", "wait")
            .json(&Self::build_body(prompt, endpoint))
            .send()
            .await
            .context("Failed to send request")?;

        let mut prediction = Self::parse_prediction(response).await?;

        // Status polling until the prediction settles; this is not a retry
        loop {
            match prediction.status.as_str() {
                "succeeded" => {
                    debug!("Prediction {:?} for {} succeeded", prediction.id, endpoint.model);
                    return Ok(prediction.output_text());
                }
                "failed" | "canceled" => {
                    anyhow::bail!(
                        "Prediction {} for {}: {}",
                        prediction.status,
                        endpoint.model,
                        prediction.error
                    );
                }
                _ => {
                    let url = prediction
                        .urls
                        .as_ref()
                        .and_then(|urls| urls.get.clone())
                        .context("Pending prediction has no status URL")?;

                    tokio::time::sleep(self.poll_interval).await;

                    let response = self
                        .client
                        .get(&url)
                        .bearer_auth(token)
                        .send()
                        .await
                        .context("Failed to poll prediction")?;

                    prediction = Self::parse_prediction(response).await?;
                }
            }
        }
    }
}
