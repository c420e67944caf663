//! Per-model proxy handlers
//!
//! Each catalog model is served at its own route and forwards the prompt to its
//! upstream provider.

use crate::handlers::{json_body, AppState};
use crate::models::{ModelOutput, PromptRequest};
use crate::utils::error::{
    helpers::{not_found_error, validation_error},
    AppResult,
};
use crate::utils::logging::prompt_preview;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use std::sync::Arc;
use tracing::debug;

const PROMPT_REQUIRED: &str = "Prompt is required";

/// Handle model requests
///
/// POST /api/{model-route}
///
/// Routes are taken from the catalog (e.g. "/api/llama", "/api/deepseek-openai").
/// Upstream failures answer 500 without detail; the cause is logged.
pub async fn handle_model_request(
    State(state): State<Arc<AppState>>,
    Path(endpoint): Path<String>,
    body: Result<Json<PromptRequest>, JsonRejection>,
) -> AppResult<Json<ModelOutput>> {
    let route = format!("/api/{}", endpoint);

    let model = state
        .catalog
        .model_by_route(&route)
        .ok_or_else(|| not_found_error(format!("No model is served at {}", route)))?;

    let prompt = json_body(body, PROMPT_REQUIRED)?
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| validation_error(PROMPT_REQUIRED))?;

    debug!("Received request for {} at {}: '{}'", model.id, route, prompt_preview(&prompt));

    let output = state.gateway.generate(&model.id, &prompt).await?;
    Ok(Json(ModelOutput { output }))
}
