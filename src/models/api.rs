//! HTTP wire types

use serde::{Deserialize, Serialize};

/// Tokenizer endpoint request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenizeRequest {
    #[serde(default)]
    pub text: Option<String>,
}

/// Tokenizer endpoint success body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizeResponse {
    pub token_count: usize,
}

/// Body of every per-model endpoint and of the estimate endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

/// Per-model endpoint success body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOutput {
    pub output: String,
}

/// Error body shared by all endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Session input body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionInput {
    #[serde(default)]
    pub text: String,
}

/// Answer to a session submit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub submission: u64,
    pub token_count: usize,
}
