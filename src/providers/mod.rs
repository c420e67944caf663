//! Provider module
//!
//! Defines the Provider trait and the hosted model providers

pub mod openai;
pub mod replicate;

use crate::config::EndpointConfig;
use anyhow::Result;
use async_trait::async_trait;

/// Provider trait for upstream model APIs
///
/// A provider turns a prompt plus the fixed parameters of an endpoint
/// definition into one upstream request and returns the generated text.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Send the prompt and wait for the generated output
    async fn generate(&self, prompt: &str, endpoint: &EndpointConfig) -> Result<String>;
}

pub use openai::OpenAIProvider;
pub use replicate::ReplicateProvider;
