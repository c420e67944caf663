//! One-shot estimate endpoint

use crate::handlers::{json_body, AppState};
use crate::models::{PromptRequest, SubmissionReport};
use crate::utils::error::{helpers::validation_error, AppResult};
use crate::utils::logging::prompt_preview;
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

const PROMPT_REQUIRED: &str = "Prompt is required";

/// Numbers one-shot submissions; independent of the session sequence
static ONE_SHOT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Handle estimate requests
///
/// POST /api/estimate
///
/// Tokenizes the prompt, fans it out to every model and waits for all calls
/// to settle before answering with the full report.
pub async fn handle_estimate(
    State(state): State<Arc<AppState>>,
    body: Result<Json<PromptRequest>, JsonRejection>,
) -> AppResult<Json<SubmissionReport>> {
    let prompt = json_body(body, PROMPT_REQUIRED)?
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| validation_error(PROMPT_REQUIRED))?;

    let submission = ONE_SHOT_SEQ.fetch_add(1, Ordering::Relaxed) + 1;
    info!("Estimate {} for prompt '{}'", submission, prompt_preview(&prompt));

    let report = state.pipeline.run_submission(submission, &prompt).await?;
    Ok(Json(report))
}
