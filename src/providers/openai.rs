//! OpenAI-compatible provider implementation
//!
//! Chat completions against any OpenAI-compatible base URL (DeepSeek-R1 here)

use super::Provider;
use crate::config::settings::ProviderCredentials;
use crate::config::EndpointConfig;
use crate::utils::error::AppError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

/// Chat completion response, reduced to the generated text
#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
}

/// OpenAI-compatible provider
pub struct OpenAIProvider {
    client: Client,
    base_url: Option<String>,
    api_key: Option<String>,
}

impl OpenAIProvider {
    /// Create a provider from the configured credentials
    pub fn new(credentials: &ProviderCredentials) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("promptprint/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: credentials.deepseek_api_base.clone(),
            api_key: credentials.openai_api_key.clone(),
        })
    }

    /// Build the request URL
    fn build_url(&self) -> Result<String> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| AppError::MissingCredential("DEEPSEEK_API_BASE".to_string()))?;
        Ok(format!("{}/chat/completions", base_url.trim_end_matches('/')))
    }

    /// Build the request body: fixed parameters first, then model, messages and stream
    fn build_body(prompt: &str, endpoint: &EndpointConfig) -> Value {
        let mut messages = Vec::new();
        if let Some(system) = &endpoint.system_prompt {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": prompt }));

        let mut body = endpoint.parameters.clone();
        body.insert("model".to_string(), json!(endpoint.model));
        body.insert("messages".to_string(), Value::Array(messages));
        body.insert("stream".to_string(), json!(false));
        Value::Object(body)
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &str, endpoint: &EndpointConfig) -> Result<String> {
        debug!("Sending chat completion request for {}", endpoint.model);

        let url = self.build_url()?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::MissingCredential("OPENAI_API_KEY".to_string()))?;

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&Self::build_body(prompt, endpoint))
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();

        if status.is_success() {
            let completion: ChatCompletion = response
                .json()
                .await
                .context("Failed to parse chat completion response")?;

            let output = completion
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .unwrap_or_default();

            debug!("Chat completion for {} finished", endpoint.model);
            Ok(output)
        } else {
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(error_response) = serde_json::from_str::<OpenAIErrorResponse>(&error_text) {
                error!("OpenAI-compatible API error: {}", error_response.error.message);
                anyhow::bail!("OpenAI-compatible API error: {} - {}", status, error_response.error.message);
            } else {
                error!("OpenAI-compatible API request failed: {} - {}", status, error_text);
                anyhow::bail!("OpenAI-compatible API request failed: {} - {}", status, error_text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use serde_json::Map;

    fn create_endpoint() -> EndpointConfig {
        let mut parameters = Map::new();
        parameters.insert("top_p".to_string(), json!(0.95));
        parameters.insert("temperature".to_string(), json!(0.7));

        EndpointConfig {
            route: "/api/deepseek-openai".to_string(),
            provider: "openai".to_string(),
            model: "deepseek-ai/DeepSeek-R1".to_string(),
            parameters,
            system_prompt: Some("You are a helpful assistant.".to_string()),
        }
    }

    #[test]
    fn test_build_url() {
        let mut credentials = Settings::default().providers;
        credentials.deepseek_api_base = Some("https://api.example.com/v1/".to_string());

        let provider = OpenAIProvider::new(&credentials).unwrap();
        assert_eq!(provider.build_url().unwrap(), "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn test_build_url_without_base() {
        let provider = OpenAIProvider::new(&Settings::default().providers).unwrap();
        let err = provider.build_url().unwrap_err();
        assert!(err.to_string().contains("DEEPSEEK_API_BASE"));
    }

    #[test]
    fn test_build_body() {
        let body = OpenAIProvider::build_body("Hello", &create_endpoint());

        assert_eq!(body["model"], "deepseek-ai/DeepSeek-R1");
        assert_eq!(body["stream"], false);
        assert_eq!(body["top_p"], 0.95);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Hello");
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_the_call() {
        let mut credentials = Settings::default().providers;
        credentials.deepseek_api_base = Some("http://127.0.0.1:9".to_string());

        let provider = OpenAIProvider::new(&credentials).unwrap();
        let err = provider.generate("Hello", &create_endpoint()).await.unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
